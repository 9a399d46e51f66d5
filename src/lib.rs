//! xlsxreport - Spreadsheet report templates compiled into cell-write instructions
//!
//! This crate reads spreadsheet templates whose cells embed a small macro
//! language, binds them against a hierarchical data source and produces, per
//! output sheet, a list of position-addressed write instructions. A separate
//! writer applies those instructions to a copy of the template.
//!
//! Macro language:
//!
//! - `$customers.name$`: scalar lookup (`location.attribute`)
//! - `$a.x | b.y$`: fallback chain, first non-empty value wins
//! - `#items.name#` ... `#end#` / `#grow#`: repeating block (fixed or growing)
//! - `#items.no#`: 1-based row number within a block
//! - `$order.total$~currency(JPY)`: filter invocations
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxreport::{CompilerBuilder, JsonContext};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a compiler with default settings
//!     let compiler = CompilerBuilder::new().build()?;
//!
//!     // Load the data source
//!     let mut ctx = JsonContext::from_reader(File::open("data.json")?)?;
//!
//!     // Compile the template into an instruction document
//!     let output = File::create("instructions.json")?;
//!     compiler.compile(File::open("template.xlsx")?, &mut ctx, output)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Templates Built in Code
//!
//! ```rust
//! use serde_json::json;
//! use xlsxreport::{CompilerBuilder, JsonContext, TemplateSheet};
//!
//! # fn main() -> Result<(), xlsxreport::ReportError> {
//! let sheet = TemplateSheet::new("Invoice")
//!     .with_cell("A1", "$g.title$")?
//!     .with_cell("A3", "#items.no#")?
//!     .with_cell("B3", "#items.name#")?
//!     .with_cell("A4", "#grow#")?;
//!
//! let compiler = CompilerBuilder::new().build()?;
//! let document = compiler.parse_sheets(vec![sheet])?;
//!
//! let mut ctx = JsonContext::new(json!({
//!     "g": {"title": "Invoice #42"},
//!     "items": [{"name": "Widget"}, {"name": "Gadget"}]
//! }));
//! let sheets = document.apply(&mut ctx).collect::<Result<Vec<_>, _>>()?;
//!
//! assert_eq!(sheets[0].cell_at(0, 0).map(|c| c.value.as_str()), Some("Invoice #42"));
//! assert_eq!(sheets[0].inserted_rows(), 1);
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod context;
mod error;
mod expand;
mod instructions;
mod macros;
mod output;
mod parser;
mod sheet_names;
mod template;
mod types;

// 公開API
pub use api::OutputFormat;
pub use builder::{Compiler, CompilerBuilder};
pub use context::{DataContext, JsonContext};
pub use error::ReportError;
pub use expand::{EndKind, ExpandedRow, Expansion, GroupBlock, Level, LevelBucket, OffsetTable, RowCell};
pub use instructions::{
    CellInstruction, FilterInvocation, FilterRegistry, FilterSet, Prior, SheetInstructions,
};
pub use macros::{
    CellMacro, ChainEntry, FallbackChain, FilterCall, MacroCell, PathExpression, PathMode,
    PlacedMacro, SELF_REFERENCE,
};
pub use output::{write_json, write_xml, JsonFormatter, OutputFormatter, XmlFormatter};
pub use parser::TemplateWorkbook;
pub use sheet_names::{SheetNameRegistry, MAX_SHEET_NAME_CHARS};
pub use template::{SheetIter, SheetTemplate, TemplateDocument, DIRECT_PARAMETER_LOCATION};
pub use types::{CellCoord, TemplateCell, TemplateSheet};
