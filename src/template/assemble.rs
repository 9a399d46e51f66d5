//! Sheet Assembly
//!
//! パース済みシートとデータコンテキストから、出力シート1枚分の命令を組み立てます。

use tracing::{info, warn};

use super::SheetTemplate;
use crate::context::DataContext;
use crate::error::ReportError;
use crate::expand::{EndKind, GroupBlock, OffsetTable};
use crate::instructions::{CellInstruction, Prior, SheetInstructions};

/// 出力シートを組み立てる
///
/// # 処理フロー
///
/// 1. マクロが置かれていたテンプレートセルを消去する命令を積む
/// 2. グループブロックを開始行順に展開し、必要なら行挿入命令を積む
/// 3. フラットなセルを、挿入によるずれを反映した行に配置する
pub(crate) fn assemble_sheet<C: DataContext>(
    template: &SheetTemplate,
    ctx: &mut C,
    name: String,
    multiple: bool,
) -> Result<SheetInstructions, ReportError> {
    let mut priors = clear_priors(template);
    let mut cells = Vec::new();
    let mut offsets = OffsetTable::new();

    for block in &template.groups {
        expand_block(block, ctx, &name, &mut offsets, &mut priors, &mut cells)?;
    }

    for placed in &template.flat {
        let (value, filters) = placed.cell.resolve(&*ctx, true);
        let row = placed.coord.row;
        cells.push(CellInstruction {
            row: row + offsets.offset_for(row),
            col: placed.coord.col,
            original_row: row,
            original_col: placed.coord.col,
            value,
            ref_row: None,
            filters,
        });
    }

    info!(
        sheet = %name,
        cells = cells.len(),
        inserted_rows = offsets.total(),
        "assembled output sheet"
    );

    Ok(SheetInstructions {
        name,
        template_index: template.index,
        multiple,
        priors,
        cells,
    })
}

fn clear_priors(template: &SheetTemplate) -> Vec<Prior> {
    let mut priors: Vec<Prior> = template
        .flat
        .iter()
        .map(|p| Prior::ClearCell {
            row: p.coord.row,
            col: p.coord.col,
        })
        .collect();

    for block in &template.groups {
        priors.extend(block.columns().into_iter().map(|col| Prior::ClearCell {
            row: block.start_row,
            col,
        }));
        priors.push(Prior::ClearCell {
            row: block.end_row,
            col: block.end_col,
        });
    }
    priors
}

fn expand_block<C: DataContext>(
    block: &GroupBlock,
    ctx: &mut C,
    sheet: &str,
    offsets: &mut OffsetTable,
    priors: &mut Vec<Prior>,
    cells: &mut Vec<CellInstruction>,
) -> Result<(), ReportError> {
    let delta = offsets.offset_for(block.start_row);
    let reservation = block.reservation();
    let mut emitted: u32 = 0;
    let mut dropped: u32 = 0;

    for row in block.expand(ctx) {
        let blank = row.is_blank();
        if blank && !row.placeholder {
            continue;
        }
        if block.end_kind == EndKind::Fixed && emitted >= reservation {
            dropped += 1;
            continue;
        }

        let physical = block.start_row + delta + emitted;
        let original_row = block.start_row + emitted;
        let ref_row = block.start_row + emitted.min(1);

        // 連番セルは行の先頭
        if let Some(col) = block.row_number_col {
            if !blank {
                cells.push(CellInstruction {
                    row: physical,
                    col,
                    original_row,
                    original_col: col,
                    value: (emitted + 1).to_string(),
                    ref_row: Some(ref_row),
                    filters: Vec::new(),
                });
            }
        }

        cells.extend(row.cells.into_iter().map(|cell| CellInstruction {
            row: physical,
            col: cell.col,
            original_row,
            original_col: cell.col,
            value: cell.value,
            ref_row: Some(ref_row),
            filters: cell.filters,
        }));

        emitted += 1;
    }

    if dropped > 0 {
        warn!(
            sheet = %sheet,
            start_row = block.start_row,
            reservation,
            dropped,
            "fixed group block truncated surplus rows"
        );
    }

    if block.end_kind == EndKind::Grow && emitted > reservation {
        let count = emitted - reservation;
        priors.push(Prior::InsertRows {
            before: block.end_row + delta,
            count,
            copy_from: block.start_row + 2 + delta,
        });
        offsets.record(block.end_row, count)?;
    }

    Ok(())
}
