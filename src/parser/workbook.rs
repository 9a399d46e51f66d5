//! Template Workbook Reader
//!
//! calamineを使用してテンプレートブックを読み込み、シートごとのセルテキストを抽出します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::{Cursor, Read};

use crate::error::ReportError;
use crate::types::TemplateSheet;

/// テンプレートブック
///
/// `.xlsx`/`.xls`/`.ods`のいずれもcalamineの自動判別で読み込みます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateWorkbook {
    sheets: Vec<TemplateSheet>,
}

impl TemplateWorkbook {
    /// ワークブックを開き、全シートのセルテキストを読み込む
    ///
    /// # 引数
    ///
    /// * `reader` - テンプレートファイルのリーダー
    /// * `max_size` - 入力サイズの上限（バイト）
    ///
    /// # 戻り値
    ///
    /// * `Ok(TemplateWorkbook)` - 読み込みに成功した場合
    /// * `Err(ReportError::TemplateTooLarge)` - 入力が上限を超えた場合
    /// * `Err(ReportError::Workbook)` - calamineが読み込めない形式の場合
    pub fn open<R: Read>(reader: R, max_size: u64) -> Result<Self, ReportError> {
        // 上限+1バイトまで読めば超過は判定できる
        let mut buffer = Vec::new();
        let bytes_read = reader
            .take(max_size.saturating_add(1))
            .read_to_end(&mut buffer)? as u64;

        if bytes_read > max_size {
            return Err(ReportError::TemplateTooLarge {
                size: bytes_read,
                max: max_size,
            });
        }

        let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(buffer))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let (top, left) = range.start().unwrap_or((0, 0));

            let mut sheet = TemplateSheet::new(name);
            for (row_idx, row) in range.rows().enumerate() {
                for (col_idx, cell) in row.iter().enumerate() {
                    if let Some(text) = cell_text(cell) {
                        sheet.push_cell(top + row_idx as u32, left + col_idx as u32, text);
                    }
                }
            }
            sheets.push(sheet);
        }

        Ok(Self { sheets })
    }

    pub fn sheets(&self) -> &[TemplateSheet] {
        &self.sheets
    }

    pub fn into_sheets(self) -> Vec<TemplateSheet> {
        self.sheets
    }
}

impl From<Vec<TemplateSheet>> for TemplateWorkbook {
    fn from(sheets: Vec<TemplateSheet>) -> Self {
        Self { sheets }
    }
}

/// セル値をテンプレートテキストに変換（空セルはNone）
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string().to_uppercase(),
        Data::DateTime(d) => format_number(d.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 整数値の浮動小数点は小数部なしで表示
fn format_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
