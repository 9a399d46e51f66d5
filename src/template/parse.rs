//! Template Parsing
//!
//! テンプレートシートを走査し、フラットなマクロセルとグループブロックに分類します。

use std::collections::BTreeMap;

use tracing::debug;

use super::SheetTemplate;
use crate::builder::CompilerConfig;
use crate::error::ReportError;
use crate::expand::GroupBlock;
use crate::macros::{CellMacro, MacroCell, PlacedMacro};
use crate::types::{CellCoord, TemplateSheet};

/// 開始セルが見つかり、終端待ちのブロック
struct PendingBlock {
    start: CellCoord,
    cells: Vec<PlacedMacro>,
}

/// シート1枚をパース
///
/// # 引数
///
/// * `sheet` - テンプレートシート
/// * `index` - ブック内の位置
/// * `config` - フィルタ区切り文字、入れ子上限、既知フィルタ
///
/// # 戻り値
///
/// * `Ok(SheetTemplate)` - パース成功
/// * `Err(ReportError::TemplateSyntax)` - 不正なマクロ、対応の取れないグループ、
///   同一列の重複ブロック、行範囲の重なるブロック、入れ子上限超過、未知のフィルタ
pub(crate) fn parse_sheet(
    sheet: &TemplateSheet,
    index: usize,
    config: &CompilerConfig,
) -> Result<SheetTemplate, ReportError> {
    let syntax = |coord: CellCoord, message: String| ReportError::TemplateSyntax {
        sheet: sheet.name.clone(),
        cell: coord.to_a1_notation(),
        message,
    };

    let name = MacroCell::parse(&sheet.name).map_err(|e| e.at_cell(&sheet.name, "name".to_string()))?;

    let mut cells: Vec<_> = sheet.cells.iter().collect();
    cells.sort_by_key(|c| c.coord);

    let mut flat = Vec::new();
    let mut groups = Vec::new();
    let mut pending: BTreeMap<u32, PendingBlock> = BTreeMap::new();

    let mut rows = cells.into_iter().peekable();
    while let Some(first) = rows.next() {
        let row = first.coord.row;
        let mut row_cells = vec![first];
        while let Some(next) = rows.next_if(|c| c.coord.row == row) {
            row_cells.push(next);
        }

        let mut starts = Vec::new();
        let mut ends = Vec::new();

        for cell in row_cells {
            if cell.text.trim().is_empty() {
                continue;
            }
            let parsed = CellMacro::parse(&cell.text, config.filter_separator)
                .map_err(|e| e.at_cell(&sheet.name, cell.coord.to_a1_notation()))?;

            if let Some(known) = &config.known_filters {
                if let Some(unknown) = parsed.filters.iter().find(|f| !known.contains(f.name())) {
                    return Err(syntax(
                        cell.coord,
                        format!("Unknown filter '{}'", unknown.name()),
                    ));
                }
            }

            if parsed.is_inert() {
                continue;
            }

            let placed = PlacedMacro::new(cell.coord, parsed);
            if !placed.cell.body.is_group() {
                flat.push(placed);
            } else if placed.cell.body.is_group_start() {
                starts.push(placed);
            } else {
                ends.push(placed);
            }
        }

        // 同じ行で終わるブロックを先に閉じる
        for end in ends {
            let col = end.coord.col;
            let kind = end.cell.body.end_kind().ok_or_else(|| {
                syntax(end.coord, "Unrecognized group terminator".to_string())
            })?;
            let block = pending.remove(&col).ok_or_else(|| {
                syntax(
                    end.coord,
                    format!("Group end '{}' has no matching start", end.cell.body.raw()),
                )
            })?;

            let group = GroupBlock::new(block.start.row, row, col, kind, block.cells);
            if group.depth() > config.max_nesting_depth {
                return Err(syntax(
                    block.start,
                    format!(
                        "Group nesting depth {} exceeds maximum of {}",
                        group.depth(),
                        config.max_nesting_depth
                    ),
                ));
            }
            debug!(
                sheet = %sheet.name,
                start = %block.start.to_a1_notation(),
                end_row = row,
                kind = kind.keyword(),
                depth = group.depth(),
                "registered group block"
            );
            groups.push(group);
        }

        // 1行の開始セルは最初の列に登録する1つのブロックになる
        if let Some(first_start) = starts.first() {
            let start = first_start.coord;
            if let Some(existing) = pending.get(&start.col) {
                return Err(syntax(
                    start,
                    format!(
                        "Column already has a pending group started at {}",
                        existing.start.to_a1_notation()
                    ),
                ));
            }
            // 行範囲が重なるブロックは行挿入の順序が決まらない
            if let Some(existing) = pending.values().next() {
                return Err(syntax(
                    start,
                    format!(
                        "Group block overlaps the group started at {}",
                        existing.start.to_a1_notation()
                    ),
                ));
            }
            pending.insert(start.col, PendingBlock { start, cells: starts });
        }
    }

    if let Some(unclosed) = pending.values().min_by_key(|b| b.start) {
        return Err(syntax(
            unclosed.start,
            "Group start has no matching end".to_string(),
        ));
    }

    groups.sort_by_key(|g| (g.start_row, g.end_col));

    debug!(
        sheet = %sheet.name,
        flat = flat.len(),
        groups = groups.len(),
        "parsed template sheet"
    );

    Ok(SheetTemplate {
        index,
        name,
        flat,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::EndKind;

    fn parse(cells: &[(&str, &str)]) -> Result<SheetTemplate, ReportError> {
        parse_with(cells, &CompilerConfig::default())
    }

    fn parse_with(
        cells: &[(&str, &str)],
        config: &CompilerConfig,
    ) -> Result<SheetTemplate, ReportError> {
        let mut sheet = TemplateSheet::new("Report");
        for (a1, text) in cells {
            sheet = sheet.with_cell(a1, *text).unwrap();
        }
        parse_sheet(&sheet, 0, config)
    }

    fn syntax_cell(result: Result<SheetTemplate, ReportError>) -> String {
        match result {
            Err(ReportError::TemplateSyntax { cell, .. }) => cell,
            other => panic!("expected syntax error, got {:?}", other.map(|t| t.groups.len())),
        }
    }

    #[test]
    fn test_classifies_cells() {
        let template = parse(&[
            ("A1", "$g.title$"),
            ("B1", "Heading"),
            ("C1", "Total~bold()"),
            ("A3", "#items.no#"),
            ("B3", "#items.name#"),
            ("A5", "#grow#"),
        ])
        .unwrap();

        // 定数セルは除外、フィルタ付き定数は残る
        assert_eq!(template.flat.len(), 2);
        assert_eq!(template.groups.len(), 1);

        let group = &template.groups[0];
        assert_eq!((group.start_row, group.end_row), (2, 4));
        assert_eq!(group.end_kind, EndKind::Grow);
        assert_eq!(group.row_number_col, Some(0));
        assert_eq!(group.reservation(), 2);
    }

    #[test]
    fn test_concurrent_starts_form_one_block() {
        let template = parse(&[
            ("A2", "#orders.id#"),
            ("C2", "#customers.name#"),
            ("A4", "#end#"),
        ])
        .unwrap();
        assert_eq!(template.groups.len(), 1);
        assert_eq!(template.groups[0].depth(), 2);
    }

    #[test]
    fn test_end_without_start() {
        assert_eq!(syntax_cell(parse(&[("B7", "#end#")])), "B7");
    }

    #[test]
    fn test_start_without_end() {
        assert_eq!(syntax_cell(parse(&[("C2", "#items.name#")])), "C2");
    }

    #[test]
    fn test_end_in_other_column_does_not_close() {
        assert_eq!(
            syntax_cell(parse(&[("A2", "#items.name#"), ("B4", "#end#")])),
            "B4"
        );
    }

    #[test]
    fn test_second_pending_block_in_column() {
        let result = parse(&[("A2", "#a.x#"), ("A3", "#b.y#"), ("A5", "#end#")]);
        assert_eq!(syntax_cell(result), "A3");
    }

    #[test]
    fn test_overlapping_blocks_rejected() {
        let result = parse(&[
            ("A2", "#a.x#"),
            ("B3", "#b.y#"),
            ("B4", "#grow#"),
            ("A5", "#grow#"),
        ]);
        assert_eq!(syntax_cell(result), "B3");
    }

    #[test]
    fn test_block_may_start_on_previous_end_row() {
        let template = parse(&[
            ("A2", "#a.x#"),
            ("A4", "#grow#"),
            ("B4", "#b.y#"),
            ("B6", "#grow#"),
        ])
        .unwrap();
        let ranges: Vec<_> = template
            .groups
            .iter()
            .map(|g| (g.start_row, g.end_row))
            .collect();
        assert_eq!(ranges, vec![(1, 3), (3, 5)]);
    }

    #[test]
    fn test_sequential_blocks_in_same_column() {
        let template = parse(&[
            ("A2", "#a.x#"),
            ("A3", "#end#"),
            ("A5", "#b.y#"),
            ("A7", "#grow#"),
        ])
        .unwrap();
        assert_eq!(template.groups.len(), 2);
        assert_eq!(template.groups[1].end_kind, EndKind::Grow);
    }

    #[test]
    fn test_malformed_macro_reports_cell() {
        assert_eq!(syntax_cell(parse(&[("D4", "$a..b$")])), "D4");
    }

    #[test]
    fn test_nesting_limit() {
        let config = CompilerConfig {
            max_nesting_depth: 1,
            ..CompilerConfig::default()
        };
        let result = parse_with(
            &[("A2", "#a.x#"), ("B2", "#a.b.y#"), ("A3", "#end#")],
            &config,
        );
        assert_eq!(syntax_cell(result), "A2");
    }

    #[test]
    fn test_known_filters() {
        let config = CompilerConfig {
            known_filters: Some(["bold".to_string()].into_iter().collect()),
            ..CompilerConfig::default()
        };
        assert!(parse_with(&[("A1", "$a.b$~bold()")], &config).is_ok());
        assert_eq!(
            syntax_cell(parse_with(&[("A1", "$a.b$~italic()")], &config)),
            "A1"
        );
    }

    #[test]
    fn test_sheet_name_macro() {
        let mut sheet = TemplateSheet::new("$customers.name$");
        sheet.push_cell(0, 0, "$customers.name$");
        let template = parse_sheet(&sheet, 3, &CompilerConfig::default()).unwrap();
        assert!(!template.name.is_const());
        assert_eq!(template.index, 3);
    }
}
