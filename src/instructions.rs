//! Instruction Types
//!
//! 出力シートごとの命令ドキュメント（事前処理とセル書き込み）を定義します。
//! 書き込み側はこの命令列だけを見て、テンプレートのコピーにセル値を反映します。

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::ReportError;

/// セル書き込みより前に適用する構造変更
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Prior {
    /// テンプレート上のマクロ文字列を消去
    ClearCell { row: u32, col: u32 },
    /// `before`行の直前に`count`行を挿入し、`copy_from`行の書式を複製
    InsertRows { before: u32, count: u32, copy_from: u32 },
}

/// フィルタ呼び出し（引数は解決済み）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterInvocation {
    pub name: String,
    pub args: Vec<String>,
}

/// 1セル分の書き込み命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellInstruction {
    /// 物理行（挿入によるずれを反映済み）
    pub row: u32,
    pub col: u32,
    /// テンプレート上の行
    pub original_row: u32,
    pub original_col: u32,
    pub value: String,
    /// 書式の参照元行（グループ行のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_row: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterInvocation>,
}

impl CellInstruction {
    /// フィルタを左から順に値へ適用
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 全フィルタ適用後の値
    /// * `Err(ReportError::UnknownFilter)` - 未登録のフィルタを含む場合
    pub fn apply_filters<R: FilterRegistry + ?Sized>(
        &self,
        registry: &R,
    ) -> Result<String, ReportError> {
        self.filters.iter().try_fold(self.value.clone(), |value, f| {
            registry.apply(&f.name, &value, &f.args)
        })
    }
}

/// 出力シート1枚分の命令ドキュメント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInstructions {
    /// 出力シート名
    pub name: String,
    /// 元になったテンプレートシートの位置
    pub template_index: usize,
    /// 同じテンプレートから複数枚生成されたか
    pub multiple: bool,
    pub priors: Vec<Prior>,
    pub cells: Vec<CellInstruction>,
}

impl SheetInstructions {
    /// 指定位置のセル命令
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&CellInstruction> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    /// 行挿入命令の総行数
    pub fn inserted_rows(&self) -> u32 {
        self.priors
            .iter()
            .map(|p| match p {
                Prior::InsertRows { count, .. } => *count,
                Prior::ClearCell { .. } => 0,
            })
            .sum()
    }
}

/// フィルタ実装の提供元
pub trait FilterRegistry {
    /// 名前付きフィルタを値に適用する
    fn apply(&self, name: &str, value: &str, args: &[String]) -> Result<String, ReportError>;
}

type FilterFn = Box<dyn Fn(&str, &[String]) -> Result<String, ReportError> + Send + Sync>;

/// クロージャで構成するフィルタ集合
///
/// # 使用例
///
/// ```rust
/// use xlsxreport::{FilterRegistry, FilterSet};
///
/// let filters = FilterSet::new()
///     .with("upper", |value, _| Ok(value.to_uppercase()))
///     .with("suffix", |value, args| Ok(format!("{}{}", value, args.join(""))));
///
/// assert_eq!(filters.apply("upper", "abc", &[]).unwrap(), "ABC");
/// assert!(filters.apply("missing", "abc", &[]).is_err());
/// ```
#[derive(Default)]
pub struct FilterSet {
    filters: BTreeMap<String, FilterFn>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// フィルタを登録（同名は上書き）
    pub fn with<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&str, &[String]) -> Result<String, ReportError> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(filter));
        self
    }

    /// 登録済みのフィルタ名（`CompilerBuilder::with_known_filters`に渡せる）
    pub fn names(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSet")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FilterRegistry for FilterSet {
    fn apply(&self, name: &str, value: &str, args: &[String]) -> Result<String, ReportError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| ReportError::UnknownFilter(name.to_string()))?;
        filter(value, args)
    }
}
