//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxreportクレート全体で使用するエラー型
///
/// テンプレートの読み込み、マクロの構文解析、展開処理、命令書の出力中に
/// 発生するすべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `TemplateSyntax` / `Macro`: テンプレートの構文エラー（`parse`時にのみ発生）
/// - `Structural`: 数値フィールドの解析失敗など、テンプレート構造の破損
/// - `Config`: ビルダー設定の検証エラー
/// - `Io` / `Workbook` / `Json` / `Xml`: 入出力および外部クレート由来のエラー
///
/// データソース上にパスが存在しないことはエラーではありません。
/// 空文字列、または一致ノード0件として扱われます。
///
/// # 使用例
///
/// ```rust
/// use xlsxreport::{CompilerBuilder, ReportError, TemplateSheet};
///
/// let compiler = CompilerBuilder::new().build().unwrap();
/// let sheet = TemplateSheet::new("Report").with_cell("A1", "#items.name#").unwrap();
///
/// match compiler.parse_sheets(vec![sheet]) {
///     Err(ReportError::TemplateSyntax { cell, .. }) => assert_eq!(cell, "A1"),
///     _ => panic!("unmatched group start must be rejected"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ReportError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// テンプレートブックの読み込みエラー（calamine由来）
    #[error("Failed to read template workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// テンプレートの構文エラー
    ///
    /// 不正なマクロ、対応の取れないグループマーカー、同一列で曖昧なグループなど。
    /// エラーメッセージには、シート名、セル座標（A1記法）、詳細が含まれます。
    #[error("Template syntax error at sheet '{sheet}', cell {cell}: {message}")]
    TemplateSyntax {
        /// エラーが発生したシート名
        sheet: String,
        /// エラーが発生したセルの座標（A1記法）
        cell: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// 単一マクロの構文エラー
    ///
    /// セル位置が判明する前に検出されたエラーです。シートの解析中は
    /// `TemplateSyntax`に包み直されます。
    #[error("Malformed macro '{text}': {message}")]
    Macro {
        /// 解析対象のテキスト
        text: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// テンプレート構造の破損
    ///
    /// 座標の数値部分が整数でない場合など。欠損データではなく、
    /// テンプレート自体の破損を示します。
    #[error("Structural error: {0}")]
    Structural(String),

    /// 設定の検証に失敗したエラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSONの入出力エラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML命令書の書き込みエラー
    #[error("XML write error: {0}")]
    Xml(String),

    /// フィルタレジストリに登録されていないフィルタ
    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    /// テンプレートファイルのサイズ上限超過
    #[error("Template size {size} bytes exceeds maximum of {max} bytes")]
    TemplateTooLarge {
        /// 実際のサイズ（バイト）
        size: u64,
        /// 上限（バイト）
        max: u64,
    },
}

impl ReportError {
    /// マクロ単位のエラーを生成
    pub(crate) fn macro_error(text: &str, message: impl Into<String>) -> Self {
        ReportError::Macro {
            text: text.to_string(),
            message: message.into(),
        }
    }

    /// セル位置を付与して`TemplateSyntax`に変換
    ///
    /// `Macro`以外のエラーはそのまま返します。
    pub(crate) fn at_cell(self, sheet: &str, cell: String) -> Self {
        match self {
            ReportError::Macro { text, message } => ReportError::TemplateSyntax {
                sheet: sheet.to_string(),
                cell,
                message: format!("{} in '{}'", message, text),
            },
            other => other,
        }
    }
}

impl From<quick_xml::Error> for ReportError {
    fn from(e: quick_xml::Error) -> Self {
        ReportError::Xml(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: ReportError = io_err.into();

        match error {
            ReportError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_workbook_error_display() {
        let error: ReportError = calamine::Error::Msg("Corrupted file").into();
        let msg = error.to_string();
        assert!(msg.contains("Failed to read template workbook"));
        assert!(msg.contains("Corrupted file"));
    }

    #[test]
    fn test_template_syntax_display() {
        let error = ReportError::TemplateSyntax {
            sheet: "Invoice".to_string(),
            cell: "B5".to_string(),
            message: "group end without a matching start".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.starts_with("Template syntax error"));
        assert!(msg.contains("Invoice"));
        assert!(msg.contains("B5"));
    }

    // Macroエラーはセル位置付きのTemplateSyntaxに変換される
    #[test]
    fn test_at_cell_wraps_macro_error() {
        let error = ReportError::macro_error("$a..b$", "empty path element");
        match error.at_cell("Sheet1", "C3".to_string()) {
            ReportError::TemplateSyntax {
                sheet,
                cell,
                message,
            } => {
                assert_eq!(sheet, "Sheet1");
                assert_eq!(cell, "C3");
                assert!(message.contains("empty path element"));
                assert!(message.contains("$a..b$"));
            }
            other => panic!("Expected TemplateSyntax, got {:?}", other),
        }
    }

    #[test]
    fn test_at_cell_keeps_other_errors() {
        let error = ReportError::Structural("bad row".to_string());
        assert!(matches!(
            error.at_cell("Sheet1", "A1".to_string()),
            ReportError::Structural(_)
        ));
    }

    #[test]
    fn test_all_error_formats() {
        assert!(ReportError::Config("x".to_string())
            .to_string()
            .starts_with("Configuration error"));
        assert!(ReportError::Structural("x".to_string())
            .to_string()
            .starts_with("Structural error"));
        assert!(ReportError::UnknownFilter("upper".to_string())
            .to_string()
            .contains("upper"));
        let too_large = ReportError::TemplateTooLarge { size: 10, max: 5 };
        assert!(too_large.to_string().contains("exceeds maximum"));
    }
}
