//! Template Document Module
//!
//! パース済みテンプレートブックを保持し、データコンテキストに適用して
//! 出力シートごとの命令ドキュメントを生成します。

mod assemble;
pub(crate) mod parse;

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::context::DataContext;
use crate::error::ReportError;
use crate::expand::GroupBlock;
use crate::instructions::SheetInstructions;
use crate::macros::{MacroCell, PlacedMacro};
use crate::sheet_names::SheetNameRegistry;

/// 呼び出し側がデータソースのルートで渡すパラメータのロケーション
pub const DIRECT_PARAMETER_LOCATION: &str = "g";

/// パース済みのテンプレートシート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTemplate {
    /// ブック内の位置
    pub index: usize,
    /// シート名（パスを含む場合はノードごとに1枚出力）
    pub name: MacroCell,
    /// グループに属さないマクロセル
    pub flat: Vec<PlacedMacro>,
    /// 開始行順のグループブロック
    pub groups: Vec<GroupBlock>,
}

impl SheetTemplate {
    /// シート名の展開に使うロケーション
    fn name_location(&self) -> Option<&str> {
        self.name
            .paths()
            .first()
            .map(|p| p.chain().first().location.as_str())
    }

    /// このテンプレートから生成される出力シートをすべて組み立てる
    fn render_all<C: DataContext>(&self, ctx: &mut C) -> Result<Vec<SheetInstructions>, ReportError> {
        let Some(location) = self.name_location() else {
            return Ok(vec![self.render(ctx, false)?]);
        };
        ctx.query(location)
            .into_iter()
            .map(|node| ctx.with_node(location, node, |ctx| self.render(ctx, true)))
            .collect()
    }

    fn render<C: DataContext>(&self, ctx: &mut C, multiple: bool) -> Result<SheetInstructions, ReportError> {
        let name = self.name.value(&*ctx, true);
        assemble::assemble_sheet(self, ctx, name, multiple)
    }
}

/// パース済みテンプレートブック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    pub sheets: Vec<SheetTemplate>,
    pub(crate) normalize_names: bool,
}

impl TemplateDocument {
    pub(crate) fn new(sheets: Vec<SheetTemplate>, normalize_names: bool) -> Self {
        Self {
            sheets,
            normalize_names,
        }
    }

    /// データコンテキストに適用し、出力シートを遅延生成する
    ///
    /// シート名がパスの場合、ルートからそのロケーションを問い合わせ、ノードごとに
    /// コンテキストへ積んだ状態で1枚ずつ組み立てます。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xlsxreport::{CompilerBuilder, JsonContext, TemplateSheet};
    ///
    /// # fn main() -> Result<(), xlsxreport::ReportError> {
    /// let sheet = TemplateSheet::new("$customers.name$")
    ///     .with_cell("A1", "$customers.name$")?
    ///     .with_cell("A2", "#customers.orders.id#")?
    ///     .with_cell("A3", "#grow#")?;
    /// let document = CompilerBuilder::new().build()?.parse_sheets(vec![sheet])?;
    ///
    /// let mut ctx = JsonContext::new(json!({"customers": [
    ///     {"name": "Acme", "orders": [{"id": 1}, {"id": 2}]},
    ///     {"name": "Globex", "orders": [{"id": 3}]}
    /// ]}));
    /// let sheets = document.apply(&mut ctx).collect::<Result<Vec<_>, _>>()?;
    ///
    /// assert_eq!(sheets.len(), 2);
    /// assert_eq!(sheets[0].name, "Acme");
    /// assert_eq!(sheets[0].inserted_rows(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn apply<'a, C: DataContext>(&'a self, ctx: &'a mut C) -> SheetIter<'a, C> {
        SheetIter {
            document: self,
            ctx,
            next_sheet: 0,
            current: None,
            names: SheetNameRegistry::new(),
        }
    }

    /// テンプレートシートごとに独立したコンテキストで並列に適用する
    ///
    /// 結果はテンプレートシート順です。
    ///
    /// # 引数
    ///
    /// * `factory` - シートごとに新しいコンテキストを生成するクロージャ
    pub fn apply_parallel<C, F>(&self, factory: F) -> Result<Vec<SheetInstructions>, ReportError>
    where
        C: DataContext,
        F: Fn() -> C + Sync,
    {
        let rendered = self
            .sheets
            .par_iter()
            .map(|sheet| {
                let mut ctx = factory();
                sheet.render_all(&mut ctx)
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        let mut names = SheetNameRegistry::new();
        Ok(rendered
            .into_iter()
            .flatten()
            .map(|mut sheet| {
                if self.normalize_names {
                    sheet.name = names.register(&sheet.name);
                }
                sheet
            })
            .collect())
    }

    /// フラットなマクロが`g`ロケーションで参照する属性
    pub fn direct_parameters(&self) -> BTreeSet<String> {
        let bodies = self.sheets.iter().flat_map(|s| s.flat.iter()).flat_map(|p| {
            std::iter::once(&p.cell.body).chain(p.cell.filters.iter().flat_map(|f| f.args()))
        });

        bodies
            .flat_map(|cell| cell.paths())
            .flat_map(|path| path.chain().entries())
            .filter(|e| e.location == DIRECT_PARAMETER_LOCATION && !e.is_self_reference())
            .map(|e| e.attribute.clone())
            .collect()
    }

    /// 出力シートが何枚になるかに関わらず、テンプレートシート数
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// 出力シートの遅延シーケンス
///
/// パス名シートのノードはテンプレートシートに入った時点で問い合わせ、
/// 1枚ごとに積んで降ろします。
pub struct SheetIter<'a, C: DataContext> {
    document: &'a TemplateDocument,
    ctx: &'a mut C,
    next_sheet: usize,
    current: Option<(&'a SheetTemplate, &'a str, std::vec::IntoIter<C::Node>)>,
    names: SheetNameRegistry,
}

impl<C: DataContext> SheetIter<'_, C> {
    fn finish(&mut self, sheet: Result<SheetInstructions, ReportError>) -> Result<SheetInstructions, ReportError> {
        let mut sheet = sheet?;
        if self.document.normalize_names {
            sheet.name = self.names.register(&sheet.name);
        }
        Ok(sheet)
    }
}

impl<C: DataContext> Iterator for SheetIter<'_, C> {
    type Item = Result<SheetInstructions, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((template, location, nodes)) = &mut self.current {
                let (template, location) = (*template, *location);
                match nodes.next() {
                    Some(node) => {
                        let sheet = self
                            .ctx
                            .with_node(location, node, |ctx| template.render(ctx, true));
                        return Some(self.finish(sheet));
                    }
                    None => self.current = None,
                }
            }

            let template = self.document.sheets.get(self.next_sheet)?;
            self.next_sheet += 1;

            match template.name_location() {
                None => {
                    let sheet = template.render(self.ctx, false);
                    return Some(self.finish(sheet));
                }
                Some(location) => {
                    let nodes = self.ctx.query(location).into_iter();
                    self.current = Some((template, location, nodes));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CompilerBuilder;
    use crate::context::JsonContext;
    use crate::types::TemplateSheet;
    use serde_json::{json, Value};

    fn customers() -> Value {
        json!({
            "g": {"title": "Customers", "date": "2024-01-31"},
            "customers": [
                {"name": "Acme", "orders": [{"id": 1}, {"id": 2}]},
                {"name": "Globex", "orders": []},
                {"name": "Initech", "orders": [{"id": 3}]}
            ]
        })
    }

    fn document(sheets: Vec<TemplateSheet>) -> TemplateDocument {
        CompilerBuilder::new()
            .build()
            .unwrap()
            .parse_sheets(sheets)
            .unwrap()
    }

    fn per_customer() -> TemplateSheet {
        TemplateSheet::new("$customers.name$")
            .with_cell("A1", "$g.title$: $customers.name$")
            .unwrap()
            .with_cell("A3", "#customers.orders.id#")
            .unwrap()
            .with_cell("A4", "#end#")
            .unwrap()
    }

    #[test]
    fn test_one_sheet_per_node() {
        let doc = document(vec![per_customer()]);
        let mut ctx = JsonContext::new(customers());
        let sheets: Vec<_> = doc.apply(&mut ctx).collect::<Result<_, _>>().unwrap();

        let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Globex", "Initech"]);
        assert!(sheets.iter().all(|s| s.multiple));

        let heading = sheets[1].cell_at(0, 0).unwrap();
        assert_eq!(heading.value, "Customers: Globex");
        assert_eq!(sheets[2].cell_at(2, 0).unwrap().value, "3");
        assert_eq!(ctx.cached_len(), 0);
    }

    // シート名と同じロケーションを繰り返すグループがシートのノードを上書きしない
    #[test]
    fn test_group_over_sheet_location_keeps_sheet_node() {
        let sheet = TemplateSheet::new("$customers.name$")
            .with_cell("A1", "$customers.name$")
            .unwrap()
            .with_cell("A3", "#customers.name#")
            .unwrap()
            .with_cell("A4", "#end#")
            .unwrap();
        let doc = document(vec![sheet]);
        let mut ctx = JsonContext::new(json!({
            "customers": [{"name": "Acme"}, {"name": "Globex"}]
        }));
        let sheets: Vec<_> = doc.apply(&mut ctx).collect::<Result<_, _>>().unwrap();

        assert_eq!(sheets.len(), 2);
        for (sheet, expected) in sheets.iter().zip(["Acme", "Globex"]) {
            assert_eq!(sheet.name, expected);
            assert_eq!(sheet.cell_at(0, 0).unwrap().value, expected);
            assert_eq!(sheet.cell_at(2, 0).unwrap().value, expected);
        }
        assert_eq!(ctx.cached_len(), 0);
    }

    #[test]
    fn test_constant_sheet_name() {
        let sheet = TemplateSheet::new("Summary")
            .with_cell("B2", "$g.date$")
            .unwrap();
        let doc = document(vec![sheet]);
        let mut ctx = JsonContext::new(customers());
        let sheets: Vec<_> = doc.apply(&mut ctx).collect::<Result<_, _>>().unwrap();

        assert_eq!(sheets.len(), 1);
        assert!(!sheets[0].multiple);
        assert_eq!(sheets[0].cell_at(1, 1).unwrap().value, "2024-01-31");
    }

    #[test]
    fn test_sheets_are_lazy() {
        let doc = document(vec![per_customer()]);
        let mut ctx = JsonContext::new(customers());
        let mut iter = doc.apply(&mut ctx);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.name, "Acme");
        drop(iter);
        assert_eq!(ctx.cached_len(), 0);
    }

    #[test]
    fn test_duplicate_names_normalized() {
        let doc = document(vec![
            TemplateSheet::new("Report"),
            TemplateSheet::new("Report"),
        ]);
        let mut ctx = JsonContext::new(json!({}));
        let names: Vec<_> = doc
            .apply(&mut ctx)
            .map(|s| s.unwrap().name)
            .collect();
        assert_eq!(names, vec!["Report", "Report2"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let doc = document(vec![
            per_customer(),
            TemplateSheet::new("Summary").with_cell("A1", "$g.title$").unwrap(),
        ]);

        let mut ctx = JsonContext::new(customers());
        let sequential: Vec<_> = doc.apply(&mut ctx).collect::<Result<_, _>>().unwrap();
        let parallel = doc.apply_parallel(|| JsonContext::new(customers())).unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 4);
        assert_eq!(parallel[3].template_index, 1);
    }

    #[test]
    fn test_direct_parameters() {
        let sheet = TemplateSheet::new("S")
            .with_cell("A1", "$g.title$")
            .unwrap()
            .with_cell("A2", "$g.subtitle | g.title$~pad($g.width$)")
            .unwrap()
            .with_cell("A3", "$other.x$")
            .unwrap()
            .with_cell("A4", "#g.ignored#")
            .unwrap()
            .with_cell("A5", "#end#")
            .unwrap();
        let params: Vec<_> = document(vec![sheet]).direct_parameters().into_iter().collect();
        assert_eq!(params, vec!["subtitle", "title", "width"]);
    }
}
