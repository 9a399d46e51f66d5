//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// 出力フォーマット
///
/// 命令ドキュメントをエンコードする形式を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputFormat {
    /// JSON形式（デフォルト）
    ///
    /// # 出力例
    ///
    /// シートは1行に1つずつ書き出されます。
    ///
    /// ```json
    /// {"sheets":[
    /// {"name":"Report","template_index":0,"multiple":false,"priors":[{"op":"clear_cell","row":0,"col":0}],"cells":[{"row":0,"col":0,"original_row":0,"original_col":0,"value":"Monthly"}]}
    /// ]}
    /// ```
    Json,

    /// XML形式
    ///
    /// 要素構成は`XmlFormatter`を参照してください。
    Xml,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}
