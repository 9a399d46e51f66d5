//! GroupBlock Module
//!
//! `#path#`行から`#end#`/`#grow#`行までの繰り返しブロックと、
//! その深さ優先の遅延行展開を実装します。

use super::level::{Level, LevelBucket};
use super::EndKind;
use crate::context::DataContext;
use crate::instructions::FilterInvocation;
use crate::macros::PlacedMacro;

/// 展開された1セル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCell {
    pub col: u32,
    pub value: String,
    pub filters: Vec<FilterInvocation>,
}

impl RowCell {
    fn is_blank(&self) -> bool {
        self.value.is_empty() && self.filters.is_empty()
    }
}

/// 展開された1行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedRow {
    pub cells: Vec<RowCell>,
    /// ノードが1件も無かった段の代替行
    pub placeholder: bool,
}

impl ExpandedRow {
    /// すべてのセルが空値かつフィルタ無し
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(RowCell::is_blank)
    }
}

/// 繰り返しブロック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBlock {
    /// 開始行（0始まり、テンプレート上の行）
    pub start_row: u32,
    /// 終端行
    pub end_row: u32,
    /// 終端セルの列
    pub end_col: u32,
    pub end_kind: EndKind,
    /// 自動連番の列
    pub row_number_col: Option<u32>,
    level: Level,
}

impl GroupBlock {
    /// 開始行のセル群からブロックを構築
    ///
    /// 連番セルは列だけを記録し、それ以外のセルをレベルに振り分けます。
    pub fn new(
        start_row: u32,
        end_row: u32,
        end_col: u32,
        end_kind: EndKind,
        cells: Vec<PlacedMacro>,
    ) -> Self {
        let mut row_number_col = None;
        let mut level = Level::new();
        for cell in cells {
            if cell.cell.body.is_row_number() {
                row_number_col = Some(cell.coord.col);
            } else {
                level.append(cell);
            }
        }

        Self {
            start_row,
            end_row,
            end_col,
            end_kind,
            row_number_col,
            level,
        }
    }

    /// 予約行数
    pub fn reservation(&self) -> u32 {
        self.end_row.saturating_sub(self.start_row)
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    /// 入れ子の段数
    pub fn depth(&self) -> usize {
        self.level.len()
    }

    /// 開始行でマクロが置かれていた列（連番列を含む）
    pub fn columns(&self) -> Vec<u32> {
        let mut cols: Vec<u32> = self.level.cells().map(|c| c.coord.col).collect();
        cols.extend(self.row_number_col);
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// 行を遅延生成するイテレータを返す
    ///
    /// イテレータが積んだキャッシュは、消費し切った場合も途中で破棄された場合も
    /// すべて降ろされます。
    pub fn expand<'a, C: DataContext>(&'a self, ctx: &'a mut C) -> Expansion<'a, C> {
        Expansion {
            ctx,
            buckets: self.level.buckets(),
            frames: Vec::new(),
            state: State::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Running,
    Done,
}

/// 入れ子の1段分の反復状態
struct Frame<N> {
    pending: std::vec::IntoIter<N>,
    part: Vec<RowCell>,
    emitted: bool,
    /// ノードを積んでいるか（代替行の段では偽）
    holds_node: bool,
}

impl<N> Frame<N> {
    fn placeholder(part: Vec<RowCell>) -> Self {
        Self {
            pending: Vec::new().into_iter(),
            part,
            emitted: false,
            holds_node: false,
        }
    }

    /// 初回は段の値、以降は同じ列の空セル
    fn take_part(&mut self) -> Vec<RowCell> {
        if self.emitted {
            return self
                .part
                .iter()
                .map(|c| RowCell {
                    col: c.col,
                    value: String::new(),
                    filters: Vec::new(),
                })
                .collect();
        }
        self.emitted = true;
        self.part.clone()
    }
}

/// 深さ優先の行展開イテレータ
///
/// 各段はノードごとに`cache`、`clear_children`、評価、子の展開を行い、
/// 兄弟ノードへ移る前に`release`します。
pub struct Expansion<'a, C: DataContext> {
    ctx: &'a mut C,
    buckets: &'a [LevelBucket],
    frames: Vec<Frame<C::Node>>,
    state: State,
}

impl<'a, C: DataContext> Expansion<'a, C> {
    fn evaluate(ctx: &C, bucket: &LevelBucket, keep_filters: bool) -> Vec<RowCell> {
        bucket
            .cells
            .iter()
            .map(|placed| {
                if keep_filters {
                    let (value, filters) = placed.cell.resolve(ctx, false);
                    RowCell {
                        col: placed.coord.col,
                        value,
                        filters,
                    }
                } else {
                    RowCell {
                        col: placed.coord.col,
                        value: placed.cell.body.value(ctx, false),
                        filters: Vec::new(),
                    }
                }
            })
            .collect()
    }

    /// 代替行の段に当たるまで、あるいは最深段まで下りる
    fn descend(&mut self) {
        let buckets = self.buckets;
        while self.frames.len() < buckets.len() {
            if self.frames.last().is_some_and(|f| !f.holds_node) {
                break;
            }
            let bucket = &buckets[self.frames.len()];
            let mut nodes = self.ctx.query(&bucket.prefix).into_iter();

            match nodes.next() {
                Some(node) => {
                    self.ctx.cache(&bucket.prefix, node);
                    self.ctx.clear_children(&bucket.prefix);
                    let part = Self::evaluate(self.ctx, bucket, true);
                    self.frames.push(Frame {
                        pending: nodes,
                        part,
                        emitted: false,
                        holds_node: true,
                    });
                }
                None => {
                    self.ctx.clear_children(&bucket.prefix);
                    let part = Self::evaluate(self.ctx, bucket, false);
                    self.frames.push(Frame::placeholder(part));
                }
            }
        }
    }

    /// 最深段を次の兄弟ノードへ進める。尽きた段は降ろして1段上へ戻る
    fn advance(&mut self) {
        let buckets = self.buckets;
        while let Some(depth) = self.frames.len().checked_sub(1) {
            let bucket = &buckets[depth];
            let frame = &mut self.frames[depth];

            if frame.holds_node {
                self.ctx.release(&bucket.prefix);
                frame.holds_node = false;
            }
            if let Some(node) = frame.pending.next() {
                self.ctx.cache(&bucket.prefix, node);
                self.ctx.clear_children(&bucket.prefix);
                frame.part = Self::evaluate(self.ctx, bucket, true);
                frame.emitted = false;
                frame.holds_node = true;
                return;
            }
            self.frames.pop();
        }
    }

    fn current_row(&mut self) -> ExpandedRow {
        let placeholder = self.frames.last().is_some_and(|f| !f.holds_node);
        let cells = self.frames.iter_mut().flat_map(Frame::take_part).collect();
        ExpandedRow { cells, placeholder }
    }
}

impl<C: DataContext> Iterator for Expansion<'_, C> {
    type Item = ExpandedRow;

    fn next(&mut self) -> Option<ExpandedRow> {
        match self.state {
            State::Done => return None,
            State::Start => {
                self.state = State::Running;
                if self.buckets.is_empty() {
                    self.state = State::Done;
                    return Some(ExpandedRow::default());
                }
            }
            State::Running => {
                self.advance();
                if self.frames.is_empty() {
                    self.state = State::Done;
                    return None;
                }
            }
        }

        self.descend();
        Some(self.current_row())
    }
}

impl<C: DataContext> Drop for Expansion<'_, C> {
    fn drop(&mut self) {
        while let Some(frame) = self.frames.pop() {
            if frame.holds_node {
                let bucket = &self.buckets[self.frames.len()];
                self.ctx.release(&bucket.prefix);
            }
        }
    }
}
