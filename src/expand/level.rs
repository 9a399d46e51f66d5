//! Level Module
//!
//! グループ内のセルを最大プレフィックスごとにまとめ、入れ子の反復順序を決定します。

use crate::macros::PlacedMacro;

/// 同じプレフィックスを持つセルの集まり
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelBucket {
    /// 反復対象のパス
    pub prefix: String,
    /// プレフィックスの深さ（`/`の数）
    pub depth: usize,
    /// 列順のセル
    pub cells: Vec<PlacedMacro>,
}

impl LevelBucket {
    /// バケット先頭（最小列）のセルの列
    pub fn first_col(&self) -> u32 {
        self.cells.first().map(|c| c.coord.col).unwrap_or(u32::MAX)
    }
}

/// プレフィックス -> (深さ, セル列) の対応
///
/// 反復は各バケット先頭セルの列の昇順です。1行に独立した入れ子の次元が
/// 複数ある場合、左側の列にあるものが外側で回ります。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Level {
    buckets: Vec<LevelBucket>,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    /// セルを対応するバケットに追加
    pub fn append(&mut self, cell: PlacedMacro) {
        let prefix = cell.cell.body.max_prefix().to_string();
        let depth = prefix.matches('/').count();

        match self.buckets.iter_mut().find(|b| b.prefix == prefix) {
            Some(bucket) => {
                bucket.depth = bucket.depth.min(depth);
                let pos = bucket
                    .cells
                    .partition_point(|c| c.coord.col <= cell.coord.col);
                bucket.cells.insert(pos, cell);
            }
            None => self.buckets.push(LevelBucket {
                prefix,
                depth,
                cells: vec![cell],
            }),
        }

        self.buckets.sort_by_key(LevelBucket::first_col);
    }

    /// バケットを反復順に返す
    pub fn buckets(&self) -> &[LevelBucket] {
        &self.buckets
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelBucket> {
        self.buckets.iter()
    }

    /// 入れ子の段数
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// すべてのセル
    pub fn cells(&self) -> impl Iterator<Item = &PlacedMacro> {
        self.buckets.iter().flat_map(|b| b.cells.iter())
    }
}
