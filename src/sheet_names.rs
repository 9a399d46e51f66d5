//! Sheet Name Registry
//!
//! 出力シート名をExcelの制約（31文字、重複不可）に合わせて正規化します。

use std::collections::HashSet;

/// シート名の最大文字数
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// 生成済みシート名の登録簿
#[derive(Debug, Clone, Default)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一意なシート名を払い出す
    ///
    /// 31文字に切り詰めた上で、既出の名前には`2`から始まる連番を付けます。
    /// 連番を付けても31文字に収まるよう、元の名前側を削ります。
    /// 比較は大文字小文字を区別しません（Excelと同じ）。
    pub fn register(&mut self, name: &str) -> String {
        let base = if name.is_empty() { "Sheet" } else { name };
        let mut candidate = truncate_chars(base, MAX_SHEET_NAME_CHARS);
        let mut counter = 1u32;

        while self.used.contains(&candidate.to_lowercase()) {
            counter += 1;
            let suffix = counter.to_string();
            let room = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.len());
            candidate = format!("{}{}", truncate_chars(base, room), suffix);
        }

        self.used.insert(candidate.to_lowercase());
        candidate
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
