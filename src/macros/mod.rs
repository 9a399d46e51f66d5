//! Macro Module
//!
//! テンプレートセルに埋め込まれたマクロ言語の構文解析を提供します。
//!
//! - `$path$` / `$a | b$`: スカラー参照とフォールバック
//! - `#path#` ... `#end#` / `#grow#`: 繰り返しブロック
//! - `#no#`: 自動連番
//! - `~FUNC(arg, ...)`: フィルタ

mod cell;
mod filter;
mod path;
mod tokens;

pub use cell::MacroCell;
pub use filter::FilterCall;
pub use path::{ChainEntry, FallbackChain, PathExpression, PathMode, SELF_REFERENCE};

use crate::context::DataContext;
use crate::error::ReportError;
use crate::instructions::FilterInvocation;
use crate::types::CellCoord;

/// フィルタ付きのセル式
///
/// セルテキストをフィルタ区切り文字で分割した結果です。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMacro {
    pub body: MacroCell,
    pub filters: Vec<FilterCall>,
}

impl CellMacro {
    /// セルテキストをマクロ本体とフィルタ列に分解してパース
    pub fn parse(text: &str, separator: char) -> Result<Self, ReportError> {
        let mut parts = tokens::split_outside_spans(text, separator).into_iter();
        let body = MacroCell::parse(parts.next().unwrap_or_default())?;
        let filters = parts.map(FilterCall::parse).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { body, filters })
    }

    /// 展開に無関係な定数セル（マクロもフィルタも無い）かどうか
    pub fn is_inert(&self) -> bool {
        self.body.is_const() && self.filters.is_empty()
    }

    /// セル値とフィルタ呼び出しを解決
    ///
    /// セル本体を先に、続いてフィルタ引数を左から順に評価します。
    pub fn resolve<C: DataContext + ?Sized>(
        &self,
        ctx: &C,
        search: bool,
    ) -> (String, Vec<FilterInvocation>) {
        let value = self.body.value(ctx, search);
        let filters = self.filters.iter().map(|f| f.invoke(ctx)).collect();
        (value, filters)
    }
}

/// テンプレート上の位置を持つセル式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedMacro {
    pub coord: CellCoord,
    pub cell: CellMacro,
}

impl PlacedMacro {
    pub fn new(coord: CellCoord, cell: CellMacro) -> Self {
        Self { coord, cell }
    }
}
