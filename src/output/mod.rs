//! Output Format Module
//!
//! 命令ドキュメントのエンコードを出力形式ごとに切り替えるモジュール。

mod formatters;

use crate::api::OutputFormat;
use crate::error::ReportError;
use crate::instructions::SheetInstructions;
use std::borrow::Borrow;
use std::io::Write;

pub use formatters::*;

/// 出力フォーマッター
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Json,
    Xml,
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => OutputFormatter::Json,
            OutputFormat::Xml => OutputFormatter::Xml,
        }
    }

    /// 命令ドキュメント列を指定されたフォーマットで出力する
    ///
    /// # 引数
    ///
    /// * `sheets` - 出力するシート命令
    /// * `writer` - 出力先のライター
    pub fn render<W: Write>(
        &self,
        sheets: &[SheetInstructions],
        writer: &mut W,
    ) -> Result<(), ReportError> {
        self.render_stream(sheets.iter().map(Ok::<_, ReportError>), writer)
    }

    /// 生成されたシートを1枚ずつ書き出す
    ///
    /// `TemplateDocument::apply`の結果をそのまま渡せます。
    /// エラーが返された時点で中断し、それまでに書き出した内容は残ります。
    pub fn render_stream<W, I, S>(&self, sheets: I, writer: &mut W) -> Result<(), ReportError>
    where
        W: Write,
        I: IntoIterator<Item = Result<S, ReportError>>,
        S: Borrow<SheetInstructions>,
    {
        match self {
            OutputFormatter::Json => JsonFormatter.render_stream(sheets, writer),
            OutputFormatter::Xml => XmlFormatter.render_stream(sheets, writer),
        }
    }
}

/// JSONで出力
pub fn write_json<W: Write>(sheets: &[SheetInstructions], writer: &mut W) -> Result<(), ReportError> {
    JsonFormatter.render(sheets, writer)
}

/// XMLで出力
pub fn write_xml<W: Write>(sheets: &[SheetInstructions], writer: &mut W) -> Result<(), ReportError> {
    XmlFormatter.render(sheets, writer)
}
