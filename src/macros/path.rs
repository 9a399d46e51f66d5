//! PathExpression Module
//!
//! `$...$` / `#...#` の本体を、(ロケーション, 属性) のフォールバックチェーンに変換します。

use crate::context::DataContext;
use crate::error::ReportError;

/// 自己参照を表す属性名
///
/// 属性が`.`のエントリは、データを参照せずロケーション文字列をそのまま返します。
pub const SELF_REFERENCE: &str = ".";

/// パスの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// `$...$` 単純なスカラー参照
    Plain,
    /// `#...#` 繰り返しの起点
    Group,
}

/// フォールバックチェーンの1エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    /// `/`区切りのロケーション
    pub location: String,
    /// 属性名（自己参照の場合は`.`）
    pub attribute: String,
}

impl ChainEntry {
    /// 自己参照エントリかどうか
    pub fn is_self_reference(&self) -> bool {
        self.attribute == SELF_REFERENCE
    }

    /// ロケーションの深さ（`/`の数）
    pub fn depth(&self) -> usize {
        self.location.matches('/').count()
    }

    /// 1つの代替パスを正規化する
    ///
    /// `.`で分割し（`@.`は区切りとみなさない）、最後のトークンを属性、
    /// それ以外を`/`で連結してロケーションとします。
    fn parse(segment: &str, body: &str) -> Result<Self, ReportError> {
        if segment.is_empty() {
            return Err(ReportError::macro_error(body, "empty fallback alternative"));
        }

        let tokens = split_unescaped_dots(segment);
        if tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ReportError::macro_error(body, "empty path element"));
        }

        let entry = match tokens.split_last() {
            Some((last, rest)) if !rest.is_empty() => ChainEntry {
                location: rest
                    .iter()
                    .map(|t| t.trim())
                    .collect::<Vec<_>>()
                    .join("/"),
                attribute: last.trim().to_string(),
            },
            _ => ChainEntry {
                location: segment.to_string(),
                attribute: SELF_REFERENCE.to_string(),
            },
        };
        Ok(entry)
    }
}

/// `@`が直前にない`.`で分割
fn split_unescaped_dots(segment: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (idx, ch) in segment.char_indices() {
        if ch == '.' && prev != Some('@') {
            parts.push(&segment[start..idx]);
            start = idx + 1;
        }
        prev = Some(ch);
    }
    parts.push(&segment[start..]);
    parts
}

/// 順序付きの代替パス列（空にはならない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    entries: Vec<ChainEntry>,
}

impl FallbackChain {
    /// 先頭エントリ
    pub fn first(&self) -> &ChainEntry {
        // 構築時に空でないことを検証済み
        &self.entries[0]
    }

    /// すべてのエントリ
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// (ロケーション, 属性) のペア列
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.location.as_str(), e.attribute.as_str()))
            .collect()
    }
}

/// 1つのマクロ本体を表すパス式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    mode: PathMode,
    source: String,
    chain: FallbackChain,
}

impl PathExpression {
    /// マクロ本体（マーカーを除く）をパース
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxreport::{PathExpression, PathMode};
    ///
    /// let path = PathExpression::parse(PathMode::Plain, "a.b | c.d").unwrap();
    /// assert_eq!(path.chain().pairs(), vec![("a", "b"), ("c", "d")]);
    /// ```
    pub fn parse(mode: PathMode, body: &str) -> Result<Self, ReportError> {
        // `$$`は空文字列の自己参照
        if mode == PathMode::Plain && body.trim().is_empty() {
            return Ok(Self {
                mode,
                source: String::new(),
                chain: FallbackChain {
                    entries: vec![ChainEntry {
                        location: String::new(),
                        attribute: SELF_REFERENCE.to_string(),
                    }],
                },
            });
        }

        let entries = body
            .split('|')
            .map(|segment| ChainEntry::parse(segment.trim(), body))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mode,
            source: body.trim().to_string(),
            chain: FallbackChain { entries },
        })
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// 元のマクロ本体
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_group(&self) -> bool {
        self.mode == PathMode::Group
    }

    /// 自動連番マーカー（`#no#`、`#items.no#`）かどうか
    pub fn is_row_number(&self) -> bool {
        if !self.is_group() {
            return false;
        }
        let first = self.chain.first();
        let head = first.location.split('/').next().unwrap_or_default();
        head.eq_ignore_ascii_case("no")
            || (!first.is_self_reference() && first.attribute.eq_ignore_ascii_case("no"))
    }

    /// グループ終端トークン（`end` / `grow`）
    ///
    /// 先頭エントリのロケーションが終端キーワードの場合に返します。
    pub(crate) fn end_keyword(&self) -> Option<&str> {
        match self.chain.first().location.as_str() {
            keyword @ ("end" | "grow") => Some(keyword),
            _ => None,
        }
    }

    /// 最も深いロケーション（同じ深さの場合は先に現れたもの）
    pub fn max_prefix(&self) -> &str {
        let mut best = self.chain.first();
        for entry in self.chain.entries() {
            if entry.depth() > best.depth() {
                best = entry;
            }
        }
        &best.location
    }

    /// 値を解決する
    ///
    /// チェーンを先頭から試し、最初に空でない値を返します。自己参照エントリは
    /// ロケーション文字列をそのまま返します。すべて空の場合は空文字列です。
    pub fn value<C: DataContext + ?Sized>(&self, ctx: &C, allow_search: bool) -> String {
        for entry in self.chain.entries() {
            if entry.is_self_reference() {
                return entry.location.clone();
            }
            let value = ctx.get(&entry.location, &entry.attribute, allow_search);
            if !value.is_empty() {
                return value;
            }
        }
        String::new()
    }
}
