//! FilterCall Module
//!
//! `~FUNC(arg1, arg2, ...)` 形式のフィルタ指定を解析します。
//! フィルタ本体の評価は外部のフィルタレジストリに委ねます。

use super::cell::MacroCell;
use super::tokens::split_outside_spans;
use crate::context::DataContext;
use crate::error::ReportError;
use crate::instructions::FilterInvocation;

/// 1つのフィルタ呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCall {
    name: String,
    args: Vec<MacroCell>,
}

impl FilterCall {
    /// フィルタ指定文字列（`~`の後ろ）をパース
    ///
    /// 引数はそれぞれマクロとして解析されます。マクロ本体の中の`,`では分割しません。
    ///
    /// ```rust
    /// use xlsxreport::FilterCall;
    ///
    /// let call = FilterCall::parse("pad($g.width$, 0)").unwrap();
    /// assert_eq!(call.name(), "pad");
    /// assert_eq!(call.args().len(), 2);
    /// ```
    pub fn parse(text: &str) -> Result<Self, ReportError> {
        let text = text.trim();
        let name_len = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        let (name, rest) = text.split_at(name_len);

        if name.is_empty() {
            return Err(ReportError::macro_error(text, "missing filter name"));
        }
        let inner = rest
            .trim_start()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| {
                ReportError::macro_error(text, "filter arguments must be enclosed in parentheses")
            })?;

        let args = if inner.trim().is_empty() {
            Vec::new()
        } else {
            split_outside_spans(inner, ',')
                .into_iter()
                .map(|arg| MacroCell::parse(arg.trim()))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            args,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[MacroCell] {
        &self.args
    }

    /// 引数を左から順に解決し、出力用の呼び出しを生成
    pub fn invoke<C: DataContext + ?Sized>(&self, ctx: &C) -> FilterInvocation {
        FilterInvocation {
            name: self.name.clone(),
            args: self.args.iter().map(|arg| arg.value(ctx, true)).collect(),
        }
    }
}
