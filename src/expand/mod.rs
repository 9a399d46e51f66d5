//! Expansion Module
//!
//! 繰り返しブロックの行展開と、行挿入に伴うオフセット管理を提供します。

mod group;
mod level;
mod offset;

pub use group::{ExpandedRow, Expansion, GroupBlock, RowCell};
pub use level::{Level, LevelBucket};
pub use offset::OffsetTable;

/// グループ終端の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndKind {
    /// `#end#`: 予約行数を超えた行は出力しない
    Fixed,
    /// `#grow#`: 予約行数を超えた分だけ行を挿入する
    Grow,
}

impl EndKind {
    /// 終端キーワードから変換（大文字小文字は区別する）
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "end" => Some(Self::Fixed),
            "grow" => Some(Self::Grow),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Fixed => "end",
            Self::Grow => "grow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_kind_keywords() {
        assert_eq!(EndKind::from_keyword("end"), Some(EndKind::Fixed));
        assert_eq!(EndKind::from_keyword("grow"), Some(EndKind::Grow));
        assert_eq!(EndKind::from_keyword("END"), None);
        assert_eq!(EndKind::Grow.keyword(), "grow");
    }
}
