//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use crate::error::ReportError;
use crate::instructions::{CellInstruction, Prior, SheetInstructions};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Borrow;
use std::io::Write;

/// JSON形式のフォーマッター
///
/// `{"sheets": [...]}`の配列要素をシート1枚ごとに1行で書き出します。
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn render<W: Write>(
        &self,
        sheets: &[SheetInstructions],
        writer: &mut W,
    ) -> Result<(), ReportError> {
        self.render_stream(sheets.iter().map(Ok::<_, ReportError>), writer)
    }

    pub fn render_stream<W, I, S>(&self, sheets: I, writer: &mut W) -> Result<(), ReportError>
    where
        W: Write,
        I: IntoIterator<Item = Result<S, ReportError>>,
        S: Borrow<SheetInstructions>,
    {
        writer.write_all(b"{\"sheets\":[")?;
        for (i, sheet) in sheets.into_iter().enumerate() {
            let sheet = sheet?;
            let separator: &[u8] = if i == 0 { b"\n" } else { b",\n" };
            writer.write_all(separator)?;
            serde_json::to_writer(&mut *writer, sheet.borrow())?;
        }
        writer.write_all(b"\n]}\n")?;
        Ok(())
    }
}

/// XML形式のフォーマッター
///
/// ```xml
/// <workbook>
///   <sheet name="Report" template="0" multiple="false">
///     <priors>
///       <clear-cell row="1" col="0"/>
///       <insert-rows before="3" count="2" copy-from="3"/>
///     </priors>
///     <cells>
///       <cell row="1" col="0" original-row="1" original-col="0" ref-row="1">
///         <value>Acme</value>
///         <filter name="bold"/>
///       </cell>
///     </cells>
///   </sheet>
/// </workbook>
/// ```
pub struct XmlFormatter;

impl XmlFormatter {
    pub fn render<W: Write>(
        &self,
        sheets: &[SheetInstructions],
        writer: &mut W,
    ) -> Result<(), ReportError> {
        self.render_stream(sheets.iter().map(Ok::<_, ReportError>), writer)
    }

    pub fn render_stream<W, I, S>(&self, sheets: I, writer: &mut W) -> Result<(), ReportError>
    where
        W: Write,
        I: IntoIterator<Item = Result<S, ReportError>>,
        S: Borrow<SheetInstructions>,
    {
        let mut xml = Writer::new_with_indent(&mut *writer, b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml.write_event(Event::Start(BytesStart::new("workbook")))?;
        for sheet in sheets {
            write_sheet(&mut xml, sheet?.borrow())?;
        }
        xml.write_event(Event::End(BytesEnd::new("workbook")))?;
        writeln!(writer)?;
        Ok(())
    }
}

fn write_sheet<W: Write>(xml: &mut Writer<W>, sheet: &SheetInstructions) -> Result<(), ReportError> {
    let mut start = BytesStart::new("sheet");
    start.push_attribute(("name", sheet.name.as_str()));
    start.push_attribute(("template", sheet.template_index.to_string().as_str()));
    start.push_attribute(("multiple", if sheet.multiple { "true" } else { "false" }));
    xml.write_event(Event::Start(start))?;

    xml.write_event(Event::Start(BytesStart::new("priors")))?;
    for prior in &sheet.priors {
        let elem = match prior {
            Prior::ClearCell { row, col } => {
                let mut e = BytesStart::new("clear-cell");
                e.push_attribute(("row", row.to_string().as_str()));
                e.push_attribute(("col", col.to_string().as_str()));
                e
            }
            Prior::InsertRows {
                before,
                count,
                copy_from,
            } => {
                let mut e = BytesStart::new("insert-rows");
                e.push_attribute(("before", before.to_string().as_str()));
                e.push_attribute(("count", count.to_string().as_str()));
                e.push_attribute(("copy-from", copy_from.to_string().as_str()));
                e
            }
        };
        xml.write_event(Event::Empty(elem))?;
    }
    xml.write_event(Event::End(BytesEnd::new("priors")))?;

    xml.write_event(Event::Start(BytesStart::new("cells")))?;
    for cell in &sheet.cells {
        write_cell(xml, cell)?;
    }
    xml.write_event(Event::End(BytesEnd::new("cells")))?;

    xml.write_event(Event::End(BytesEnd::new("sheet")))?;
    Ok(())
}

fn write_cell<W: Write>(xml: &mut Writer<W>, cell: &CellInstruction) -> Result<(), ReportError> {
    let mut start = BytesStart::new("cell");
    start.push_attribute(("row", cell.row.to_string().as_str()));
    start.push_attribute(("col", cell.col.to_string().as_str()));
    start.push_attribute(("original-row", cell.original_row.to_string().as_str()));
    start.push_attribute(("original-col", cell.original_col.to_string().as_str()));
    if let Some(ref_row) = cell.ref_row {
        start.push_attribute(("ref-row", ref_row.to_string().as_str()));
    }
    xml.write_event(Event::Start(start))?;

    xml.write_event(Event::Start(BytesStart::new("value")))?;
    xml.write_event(Event::Text(BytesText::new(&cell.value)))?;
    xml.write_event(Event::End(BytesEnd::new("value")))?;

    for filter in &cell.filters {
        let mut elem = BytesStart::new("filter");
        elem.push_attribute(("name", filter.name.as_str()));
        if filter.args.is_empty() {
            xml.write_event(Event::Empty(elem))?;
            continue;
        }
        xml.write_event(Event::Start(elem))?;
        for arg in &filter.args {
            xml.write_event(Event::Start(BytesStart::new("arg")))?;
            xml.write_event(Event::Text(BytesText::new(arg)))?;
            xml.write_event(Event::End(BytesEnd::new("arg")))?;
        }
        xml.write_event(Event::End(BytesEnd::new("filter")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("cell")))?;
    Ok(())
}
