//! MacroCell Module
//!
//! セルテキストからパス式を抽出し、位置スロット付きの値テンプレートを保持します。

use super::path::{PathExpression, PathMode};
use super::tokens::{tokenize, MacroToken, SpanKind};
use crate::context::DataContext;
use crate::error::ReportError;
use crate::expand::EndKind;

/// 値テンプレートの構成要素
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Slot(usize),
}

/// マクロを含む1セル分の式
///
/// 判定フラグ（`is_group`、`is_group_start`、`is_const`）はパース時に一度だけ
/// 計算され、以後変化しません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCell {
    raw: String,
    paths: Vec<PathExpression>,
    template: Vec<TemplatePart>,
    is_group: bool,
    is_group_start: bool,
}

impl MacroCell {
    /// セルテキストをパース
    ///
    /// # 戻り値
    ///
    /// * `Ok(MacroCell)` - パース成功（マクロを含まない定数セルも含む）
    /// * `Err(ReportError::Macro)` - マクロ本体が不正な場合
    pub fn parse(text: &str) -> Result<Self, ReportError> {
        let mut paths = Vec::new();
        let mut template = Vec::new();

        for token in tokenize(text) {
            match token {
                MacroToken::Text(literal) => template.push(TemplatePart::Literal(literal)),
                MacroToken::Macro(kind, body) => {
                    let mode = match kind {
                        SpanKind::Plain => PathMode::Plain,
                        SpanKind::Group => PathMode::Group,
                    };
                    template.push(TemplatePart::Slot(paths.len()));
                    paths.push(PathExpression::parse(mode, &body)?);
                }
            }
        }

        let first_group = paths.iter().find(|p| p.is_group());
        let is_group = first_group.is_some();
        let is_group_start = first_group.is_some_and(|p| p.end_keyword().is_none());

        Ok(Self {
            raw: text.to_string(),
            paths,
            template,
            is_group,
            is_group_start,
        })
    }

    /// 元のセルテキスト
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// セル内のすべてのパス式（出現順）
    pub fn paths(&self) -> &[PathExpression] {
        &self.paths
    }

    pub fn is_const(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn is_group_start(&self) -> bool {
        self.is_group_start
    }

    /// 自動連番セル（パスが1つだけの連番マーカー）かどうか
    pub fn is_row_number(&self) -> bool {
        matches!(self.paths.as_slice(), [only] if only.is_row_number())
    }

    /// グループ終端セルの種類
    pub fn end_kind(&self) -> Option<EndKind> {
        if !self.is_group || self.is_group_start {
            return None;
        }
        self.first_group_path()
            .and_then(|p| p.end_keyword())
            .and_then(EndKind::from_keyword)
    }

    /// 繰り返しを駆動するパス（最初のグループパス）
    pub(crate) fn first_group_path(&self) -> Option<&PathExpression> {
        self.paths.iter().find(|p| p.is_group())
    }

    /// レベル分けに使う最大プレフィックス
    pub fn max_prefix(&self) -> &str {
        self.first_group_path()
            .or_else(|| self.paths.first())
            .map(|p| p.max_prefix())
            .unwrap_or_default()
    }

    /// 値リストでスロットを置換
    ///
    /// パスが無い場合はテンプレート文字列をそのまま返します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 置換後の文字列
    /// * `Err(ReportError::Structural)` - 値の数がパスの数と一致しない場合
    pub fn evaluate(&self, values: &[String]) -> Result<String, ReportError> {
        if self.paths.is_empty() {
            return Ok(self.render(&[]));
        }
        if values.len() != self.paths.len() {
            return Err(ReportError::Structural(format!(
                "Macro '{}' expects {} values, got {}",
                self.raw,
                self.paths.len(),
                values.len()
            )));
        }
        Ok(self.render(values))
    }

    /// コンテキストから値を解決
    ///
    /// グループパスを含むセルは、制御された反復中にのみ解決されるため
    /// `search`は常に無効化されます。
    pub fn value<C: DataContext + ?Sized>(&self, ctx: &C, search: bool) -> String {
        let search = search && !self.is_group;
        let values: Vec<String> = self.paths.iter().map(|p| p.value(ctx, search)).collect();
        self.render(&values)
    }

    fn render(&self, values: &[String]) -> String {
        let mut out = String::new();
        for part in &self.template {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Slot(idx) => {
                    if let Some(value) = values.get(*idx) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}
