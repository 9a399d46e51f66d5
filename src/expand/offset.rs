//! OffsetTable Module
//!
//! 行挿入による物理行のずれを、テンプレート上の境界行ごとに記録します。

use std::collections::BTreeMap;

use crate::error::ReportError;

/// 境界行 -> 累積挿入行数
///
/// 行は追加されるのみで削除されないため、累積値は境界行に対して単調非減少です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    entries: BTreeMap<u32, u32>,
    total: u32,
}

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `boundary`の直前に`inserted`行が挿入されたことを記録
    ///
    /// 境界行は適用順に非減少でなければなりません。同じ境界行への記録は累積されます。
    pub fn record(&mut self, boundary: u32, inserted: u32) -> Result<(), ReportError> {
        if let Some((&last, _)) = self.entries.last_key_value() {
            if boundary < last {
                return Err(ReportError::Structural(format!(
                    "Row insertion at {} recorded after a later boundary {}",
                    boundary, last
                )));
            }
        }
        self.total = self.total.checked_add(inserted).ok_or_else(|| {
            ReportError::Structural("Inserted row count overflow".to_string())
        })?;
        self.entries.insert(boundary, self.total);
        Ok(())
    }

    /// テンプレート行`row`に適用するずれ（`row`以下で最大の境界行の累積値）
    pub fn offset_for(&self, row: u32) -> u32 {
        self.entries
            .range(..=row)
            .next_back()
            .map(|(_, &delta)| delta)
            .unwrap_or(0)
    }

    /// これまでに挿入された総行数
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
