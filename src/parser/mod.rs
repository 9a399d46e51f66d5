//! Parser Module
//!
//! calamineを使用したテンプレートブックの読み込み。

mod workbook;

pub use workbook::TemplateWorkbook;
