//! Data Context Module
//!
//! 階層データソースへのアクセスを抽象化するデータコンテキストを定義します。
//!
//! コンテキストはスタック規律に従う単一の可変リソースです。
//! `cache`でノードをパスに積み、`clear_children`で子孫の古いキャッシュを無効化し、
//! `release`で積んだノードを降ろします。展開処理はこの対応を構築上保証します。

mod json;

pub use json::JsonContext;

/// データソースへの問い合わせ契約
pub trait DataContext {
    /// データソース上のノードへのハンドル
    type Node: Clone;

    /// パスに一致するノードをソース順に返す
    ///
    /// キャッシュ済みのプレフィックスがあればそのノードを起点に解決し、
    /// 無ければルートから解決します。
    fn query(&self, path: &str) -> Vec<Self::Node>;

    /// ノードをパスの解決対象として積む
    fn cache(&mut self, path: &str, node: Self::Node);

    /// パスの子孫に残ったキャッシュを無効化する（パス自身は残す）
    ///
    /// 直前に積んだノードより前からある子孫は、そのノードを降ろすまで隠れます。
    fn clear_children(&mut self, path: &str);

    /// パスに最後に積んだノードを降ろし、積む前の状態に戻す
    fn release(&mut self, path: &str);

    /// スカラー値を解決する
    ///
    /// `allow_search`が偽の場合、キャッシュ済みのプレフィックスを持たない
    /// ロケーションは解決されず空文字列になります。
    fn get(&self, location: &str, attribute: &str, allow_search: bool) -> String;

    /// ノードを積んだ状態で`f`を実行し、終了時に必ず降ろす
    fn with_node<R>(&mut self, path: &str, node: Self::Node, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        self.cache(path, node);
        self.clear_children(path);
        let out = f(self);
        self.release(path);
        out
    }
}
