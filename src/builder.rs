//! Builder Module
//!
//! Fluent Builder APIを提供し、`Compiler`インスタンスを段階的に構築する。

use crate::api::OutputFormat;
use crate::context::DataContext;
use crate::error::ReportError;
use crate::instructions::SheetInstructions;
use crate::parser::TemplateWorkbook;
use crate::template::{parse::parse_sheet, TemplateDocument};
use crate::types::TemplateSheet;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::io::{BufWriter, Read, Write};

/// フィルタ区切りに使えない文字
const RESERVED_SEPARATORS: [char; 6] = ['$', '#', '|', ',', '(', ')'];

/// コンパイル処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct CompilerConfig {
    /// セルテキストとフィルタの区切り文字
    pub filter_separator: char,

    /// グループの入れ子の上限
    pub max_nesting_depth: usize,

    /// 既知のフィルタ名（Noneの場合は検査しない）
    pub known_filters: Option<BTreeSet<String>>,

    /// 出力シート名を正規化するか
    pub normalize_sheet_names: bool,

    /// テンプレートファイルの最大サイズ（バイト）
    pub max_template_size: u64,

    /// 出力フォーマット
    pub output_format: OutputFormat,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            filter_separator: '~',
            max_nesting_depth: 16,
            known_filters: None,
            normalize_sheet_names: true,
            max_template_size: 268_435_456, // 256MB
            output_format: OutputFormat::Json,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Compiler`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust
/// use xlsxreport::{CompilerBuilder, OutputFormat};
///
/// # fn main() -> Result<(), xlsxreport::ReportError> {
/// let compiler = CompilerBuilder::new()
///     .with_filter_separator('^')
///     .with_max_nesting_depth(4)
///     .with_output_format(OutputFormat::Xml)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CompilerBuilder {
    /// 内部設定（構築中）
    config: CompilerConfig,
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - フィルタ区切り: `~`
    /// - 入れ子の上限: 16
    /// - フィルタ名の検査: なし
    /// - シート名の正規化: 有効
    /// - テンプレートの最大サイズ: 256MB
    /// - 出力フォーマット: JSON
    pub fn new() -> Self {
        Self {
            config: CompilerConfig::default(),
        }
    }

    /// フィルタ区切り文字を設定する
    ///
    /// # 引数
    ///
    /// * `separator: char`: 区切り文字（`$`、`#`、`|`、`,`、括弧、空白は不可）
    pub fn with_filter_separator(mut self, separator: char) -> Self {
        self.config.filter_separator = separator;
        self
    }

    /// グループの入れ子の上限を設定する
    ///
    /// 1行に並ぶ独立したパスの段数もここに含まれます。
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// 既知のフィルタ名を設定する
    ///
    /// 設定した場合、それ以外のフィルタを含むテンプレートはパース時に
    /// `TemplateSyntax`エラーになります。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxreport::{CompilerBuilder, FilterSet};
    ///
    /// let filters = FilterSet::new().with("upper", |v, _| Ok(v.to_uppercase()));
    /// let builder = CompilerBuilder::new().with_known_filters(filters.names());
    /// ```
    pub fn with_known_filters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.known_filters = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// 出力シート名を31文字・重複なしに正規化するか
    pub fn normalize_sheet_names(mut self, normalize: bool) -> Self {
        self.config.normalize_sheet_names = normalize;
        self
    }

    /// テンプレートファイルの最大サイズ（バイト）を設定する
    pub fn with_max_template_size(mut self, bytes: u64) -> Self {
        self.config.max_template_size = bytes;
        self
    }

    /// 出力フォーマットを設定する
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// 設定を検証し、`Compiler`インスタンスを構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Compiler)`: 設定が有効な場合
    /// * `Err(ReportError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * 予約文字または空白をフィルタ区切りに指定した
    /// * 入れ子の上限が0
    /// * テンプレートの最大サイズが0
    pub fn build(self) -> Result<Compiler, ReportError> {
        let separator = self.config.filter_separator;
        if separator.is_whitespace() || RESERVED_SEPARATORS.contains(&separator) {
            return Err(ReportError::Config(format!(
                "Invalid filter separator: '{}'",
                separator
            )));
        }

        if self.config.max_nesting_depth == 0 {
            return Err(ReportError::Config(
                "Max nesting depth must be at least 1".to_string(),
            ));
        }

        if self.config.max_template_size == 0 {
            return Err(ReportError::Config(
                "Max template size must be greater than 0".to_string(),
            ));
        }

        Ok(Compiler::new(self.config))
    }
}

/// テンプレートコンパイルのファサード
///
/// テンプレートのパース、データコンテキストへの適用、命令ドキュメントの出力を
/// まとめて扱うエントリーポイントです。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use xlsxreport::{CompilerBuilder, JsonContext};
///
/// # fn main() -> Result<(), xlsxreport::ReportError> {
/// let compiler = CompilerBuilder::new().build()?;
/// let mut ctx = JsonContext::from_reader(File::open("data.json")?)?;
/// let output = File::create("instructions.json")?;
/// compiler.compile(File::open("template.xlsx")?, &mut ctx, output)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Compiler {
    /// コンパイル設定
    config: CompilerConfig,
}

impl Compiler {
    pub(crate) fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// テンプレートシートをパースする
    ///
    /// シートは並列にパースされ、結果はブック内の順序を保ちます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(TemplateDocument)` - パース済みテンプレート
    /// * `Err(ReportError::TemplateSyntax)` - 構文エラーが見つかった場合
    pub fn parse_sheets(&self, sheets: Vec<TemplateSheet>) -> Result<TemplateDocument, ReportError> {
        let parsed = sheets
            .par_iter()
            .enumerate()
            .map(|(index, sheet)| parse_sheet(sheet, index, &self.config))
            .collect::<Result<Vec<_>, ReportError>>()?;

        Ok(TemplateDocument::new(
            parsed,
            self.config.normalize_sheet_names,
        ))
    }

    /// テンプレートブックを読み込んでパースする
    ///
    /// # 引数
    ///
    /// * `input` - `.xlsx`などのテンプレートファイルのリーダー
    pub fn parse_workbook<R: Read>(&self, input: R) -> Result<TemplateDocument, ReportError> {
        let workbook = TemplateWorkbook::open(input, self.config.max_template_size)?;
        self.parse_sheets(workbook.into_sheets())
    }

    /// 命令ドキュメントを設定された形式で出力する
    pub fn render<W: Write>(
        &self,
        sheets: &[SheetInstructions],
        output: W,
    ) -> Result<(), ReportError> {
        let formatter = crate::output::OutputFormatter::from_format(self.config.output_format);
        let mut writer = BufWriter::new(output);
        formatter.render(sheets, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// パース済みテンプレートを適用し、出力シートを生成順に書き出す
    ///
    /// 保持するのは組み立て中の1枚分の命令だけです。
    pub fn render_document<C: DataContext, W: Write>(
        &self,
        document: &TemplateDocument,
        ctx: &mut C,
        output: W,
    ) -> Result<(), ReportError> {
        let formatter = crate::output::OutputFormatter::from_format(self.config.output_format);
        let mut writer = BufWriter::new(output);
        formatter.render_stream(document.apply(ctx), &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// テンプレートを読み込み、コンテキストに適用して命令ドキュメントを出力する
    ///
    /// # 処理フロー
    ///
    /// 1. テンプレートブックの読み込みとパース
    /// 2. データコンテキストへの適用（出力シートごと）
    /// 3. 組み立てたシートから順に出力
    pub fn compile<R: Read, C: DataContext, W: Write>(
        &self,
        template: R,
        ctx: &mut C,
        output: W,
    ) -> Result<(), ReportError> {
        let document = self.parse_workbook(template)?;
        self.render_document(&document, ctx, output)
    }

    /// 出力を文字列で返す
    pub fn compile_to_string<R: Read, C: DataContext>(
        &self,
        template: R,
        ctx: &mut C,
    ) -> Result<String, ReportError> {
        let mut buffer = Vec::new();
        self.compile(template, ctx, &mut buffer)?;

        let result = String::from_utf8(buffer).map_err(|e| {
            ReportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::JsonContext;
    use serde_json::json;

    #[test]
    fn test_compiler_builder_new() {
        let builder = CompilerBuilder::new();
        assert_eq!(builder.config.filter_separator, '~');
        assert_eq!(builder.config.max_nesting_depth, 16);
        assert!(builder.config.known_filters.is_none());
        assert!(builder.config.normalize_sheet_names);
        assert_eq!(builder.config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = CompilerBuilder::new()
            .with_filter_separator('^')
            .with_max_nesting_depth(3)
            .with_known_filters(["bold", "upper"])
            .normalize_sheet_names(false)
            .with_max_template_size(1024)
            .with_output_format(OutputFormat::Xml);

        assert_eq!(builder.config.filter_separator, '^');
        assert_eq!(builder.config.max_nesting_depth, 3);
        assert_eq!(builder.config.known_filters.as_ref().map(|k| k.len()), Some(2));
        assert!(!builder.config.normalize_sheet_names);
        assert_eq!(builder.config.max_template_size, 1024);
        assert_eq!(builder.config.output_format, OutputFormat::Xml);
    }

    #[test]
    fn test_build_success() {
        assert!(CompilerBuilder::new().build().is_ok());
    }

    #[test]
    fn test_build_with_reserved_separator() {
        for separator in ['$', '#', '|', ',', '(', ')', ' '] {
            match CompilerBuilder::new().with_filter_separator(separator).build() {
                Err(ReportError::Config(msg)) => assert!(msg.contains("separator")),
                _ => panic!("Expected Config error for {:?}", separator),
            }
        }
    }

    #[test]
    fn test_build_with_zero_depth() {
        let result = CompilerBuilder::new().with_max_nesting_depth(0).build();
        match result {
            Err(ReportError::Config(msg)) => assert!(msg.contains("nesting depth")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_zero_template_size() {
        let result = CompilerBuilder::new().with_max_template_size(0).build();
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[test]
    fn test_parse_sheets_keeps_order() {
        let compiler = CompilerBuilder::new().build().unwrap();
        let sheets = (0..8).map(|i| TemplateSheet::new(format!("S{}", i))).collect();
        let document = compiler.parse_sheets(sheets).unwrap();
        let indices: Vec<_> = document.sheets.iter().map(|s| s.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_render_xml() {
        let compiler = CompilerBuilder::new()
            .with_output_format(OutputFormat::Xml)
            .build()
            .unwrap();
        let document = compiler
            .parse_sheets(vec![TemplateSheet::new("S").with_cell("A1", "$g.x$").unwrap()])
            .unwrap();
        let mut ctx = JsonContext::new(json!({"g": {"x": "hello"}}));
        let sheets: Vec<_> = document.apply(&mut ctx).collect::<Result<_, _>>().unwrap();

        let mut output = Vec::new();
        compiler.render(&sheets, &mut output).unwrap();
        let xml = String::from_utf8(output).unwrap();
        assert!(xml.contains("<value>hello</value>"));
    }

    #[test]
    fn test_render_document_streams_every_sheet() {
        let compiler = CompilerBuilder::new().build().unwrap();
        let document = compiler
            .parse_sheets(vec![
                TemplateSheet::new("$regions.code$")
                    .with_cell("A1", "$regions.code$")
                    .unwrap(),
                TemplateSheet::new("Summary").with_cell("A1", "$g.x$").unwrap(),
            ])
            .unwrap();
        let mut ctx = JsonContext::new(json!({
            "g": {"x": "total"},
            "regions": [{"code": "EU"}, {"code": "US"}, {"code": "JP"}]
        }));

        let mut output = Vec::new();
        compiler.render_document(&document, &mut ctx, &mut output).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let names: Vec<_> = value["sheets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["EU", "US", "JP", "Summary"]);
        assert_eq!(ctx.cached_len(), 0);
    }

    #[test]
    fn test_compile_with_invalid_input() {
        let compiler = CompilerBuilder::new().build().unwrap();
        let mut ctx = JsonContext::new(json!({}));
        let result = compiler.compile_to_string(std::io::Cursor::new(Vec::<u8>::new()), &mut ctx);
        assert!(result.is_err());
    }
}
