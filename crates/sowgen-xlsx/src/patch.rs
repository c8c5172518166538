//! Streaming cell patcher
//!
//! Rewrites individual cells of an existing package while leaving every
//! other part untouched: unpatched entries are raw-copied, patched worksheets
//! are re-streamed event by event with new cells spliced in row/column
//! order. Existing cell styles are kept. The calculation chain is dropped and
//! `fullCalcOnLoad` is set so spreadsheet applications refresh formulas.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::address::CellAddress;
use crate::error::{XlsxError, XlsxResult};
use crate::reader::sheet_paths;
use crate::value::CellValue;
use crate::writer::cell_xml;

const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// One cell edit
#[derive(Debug, Clone, PartialEq)]
pub struct CellPatch {
    pub sheet: String,
    pub address: CellAddress,
    pub value: CellValue,
}

impl CellPatch {
    pub fn new<S: Into<String>, V: Into<CellValue>>(sheet: S, address: CellAddress, value: V) -> Self {
        Self {
            sheet: sheet.into(),
            address,
            value: value.into(),
        }
    }
}

/// Copy `src` to `dest` applying `patches`; returns the number of cells written
///
/// `dest` is replaced atomically.
pub fn patch_file<P: AsRef<Path>, Q: AsRef<Path>>(
    src: P,
    dest: Q,
    patches: &[CellPatch],
) -> XlsxResult<usize> {
    let dest = dest.as_ref();
    let input = BufReader::new(File::open(src.as_ref())?);
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let written = patch(input, tmp.as_file_mut(), patches)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(dest)?;
    log::debug!("patched {} cells into '{}'", written, dest.display());
    Ok(written)
}

/// Stream a package from `input` to `output` applying `patches`
pub fn patch<R: Read + Seek, W: Write + Seek>(
    input: R,
    output: W,
    patches: &[CellPatch],
) -> XlsxResult<usize> {
    let mut archive = zip::ZipArchive::new(input)?;
    let paths = sheet_paths(&mut archive)?;

    let mut by_part: HashMap<String, BTreeMap<u32, BTreeMap<u16, &CellValue>>> = HashMap::new();
    for p in patches {
        let part = paths
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&p.sheet))
            .map(|(_, part)| part.clone())
            .ok_or_else(|| XlsxError::SheetNotFound(p.sheet.clone()))?;
        // Later patches to the same cell win
        by_part
            .entry(part)
            .or_default()
            .entry(p.address.row)
            .or_default()
            .insert(p.address.col, &p.value);
    }
    let written = by_part
        .values()
        .map(|rows| rows.values().map(BTreeMap::len).sum::<usize>())
        .sum();

    let copy_only = by_part.is_empty();
    let mut zip = zip::ZipWriter::new(output);
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();

        if copy_only {
            zip.raw_copy_file(file)?;
            continue;
        }
        if name == CALC_CHAIN_PART {
            continue;
        }

        let rewrite: Option<Vec<u8>> = if let Some(rows) = by_part.remove(&name) {
            Some(patch_worksheet_xml(&mut file, rows)?)
        } else if name == "[Content_Types].xml" || name == "xl/_rels/workbook.xml.rels" {
            Some(drop_calc_chain_refs(&mut file)?)
        } else if name == "xl/workbook.xml" {
            Some(force_full_calc(&mut file)?)
        } else {
            None
        };

        match rewrite {
            Some(bytes) => {
                zip.start_file(
                    name,
                    zip::write::SimpleFileOptions::default()
                        .compression_method(zip::CompressionMethod::Deflated),
                )?;
                zip.write_all(&bytes)?;
            }
            None => zip.raw_copy_file(file)?,
        }
    }

    if let Some(missing) = by_part.keys().next() {
        return Err(XlsxError::MissingPart(missing.clone()));
    }

    zip.finish()?;
    Ok(written)
}

fn row_number(e: &BytesStart<'_>, previous: Option<u32>) -> u32 {
    attribute(e, b"r")
        .and_then(|r| r.parse::<u32>().ok())
        .map(|r| r.saturating_sub(1))
        .unwrap_or_else(|| previous.map_or(0, |p| p + 1))
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

struct SheetPatcher<'a, W: Write> {
    writer: Writer<W>,
    rows: BTreeMap<u32, BTreeMap<u16, &'a CellValue>>,
}

impl<'a, W: Write> SheetPatcher<'a, W> {
    fn raw(&mut self, text: &str) -> XlsxResult<()> {
        self.writer.get_mut().write_all(text.as_bytes())?;
        Ok(())
    }

    fn cell(&mut self, addr: CellAddress, style: Option<&str>, value: &CellValue) -> XlsxResult<()> {
        let style_attr = style.map(|s| format!(" s=\"{}\"", s)).unwrap_or_default();
        let xml = cell_xml(&addr.to_a1_string(), &style_attr, value);
        self.raw(&xml)
    }

    /// Write whole new rows for every pending row before `limit` (all when `None`)
    fn rows_before(&mut self, limit: Option<u32>) -> XlsxResult<()> {
        while let Some((&row, _)) = self.rows.iter().next() {
            if limit.map_or(false, |l| row >= l) {
                break;
            }
            let cells = self.rows.remove(&row).unwrap_or_default();
            self.raw(&format!("<row r=\"{}\">", row + 1))?;
            for (col, value) in cells {
                self.cell(CellAddress::new(row, col), None, value)?;
            }
            self.raw("</row>")?;
        }
        Ok(())
    }

    /// Write pending cells of `row` left of `limit` (all when `None`)
    fn cells_before(&mut self, row: u32, limit: Option<u16>) -> XlsxResult<()> {
        let pending: Vec<(u16, &CellValue)> = match self.rows.get_mut(&row) {
            Some(cells) => {
                let keep = match limit {
                    Some(l) => cells.split_off(&l),
                    None => BTreeMap::new(),
                };
                let before = std::mem::replace(cells, keep);
                before.into_iter().collect()
            }
            None => return Ok(()),
        };
        if self.rows.get(&row).map_or(false, BTreeMap::is_empty) {
            self.rows.remove(&row);
        }
        for (col, value) in pending {
            self.cell(CellAddress::new(row, col), None, value)?;
        }
        Ok(())
    }

    fn take(&mut self, addr: CellAddress) -> Option<&'a CellValue> {
        let cells = self.rows.get_mut(&addr.row)?;
        let value = cells.remove(&addr.col);
        if cells.is_empty() {
            self.rows.remove(&addr.row);
        }
        value
    }
}

fn patch_worksheet_xml<R: Read>(
    input: R,
    rows: BTreeMap<u32, BTreeMap<u16, &CellValue>>,
) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(BufReader::new(input));
    reader.trim_text(false);
    let mut out = SheetPatcher {
        writer: Writer::new(Vec::new()),
        rows,
    };

    let mut buf = Vec::new();
    let mut in_sheet_data = false;
    let mut current_row: Option<u32> = None;
    let mut last_row: Option<u32> = None;
    let mut last_col: Option<u16> = None;
    // Depth inside a replaced <c> whose original content is dropped
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
            continue;
        }
        match event {
            Event::Eof => break,
            Event::Start(ref e) if e.name().as_ref() == b"sheetData" => {
                in_sheet_data = true;
                out.writer.write_event(Event::Start(e.to_owned()))?;
            }
            Event::Empty(ref e) if e.name().as_ref() == b"sheetData" => {
                out.writer.write_event(Event::Start(e.to_owned()))?;
                out.rows_before(None)?;
                out.writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::End(ref e) if e.name().as_ref() == b"sheetData" => {
                out.rows_before(None)?;
                in_sheet_data = false;
                out.writer.write_event(Event::End(e.to_owned()))?;
            }
            Event::Start(ref e) if in_sheet_data && e.name().as_ref() == b"row" => {
                let row = row_number(e, last_row);
                out.rows_before(Some(row))?;
                out.writer.write_event(Event::Start(e.to_owned()))?;
                current_row = Some(row);
                last_row = Some(row);
                last_col = None;
            }
            Event::Empty(ref e) if in_sheet_data && e.name().as_ref() == b"row" => {
                let row = row_number(e, last_row);
                out.rows_before(Some(row))?;
                last_row = Some(row);
                if out.rows.contains_key(&row) {
                    out.writer.write_event(Event::Start(e.to_owned()))?;
                    out.cells_before(row, None)?;
                    out.writer.write_event(Event::End(BytesEnd::new("row")))?;
                } else {
                    out.writer.write_event(Event::Empty(e.to_owned()))?;
                }
            }
            Event::End(ref e) if in_sheet_data && e.name().as_ref() == b"row" => {
                if let Some(row) = current_row.take() {
                    out.cells_before(row, None)?;
                }
                out.writer.write_event(Event::End(e.to_owned()))?;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if current_row.is_some() && e.name().as_ref() == b"c" =>
            {
                let row = current_row.unwrap_or_default();
                let col = attribute(e, b"r")
                    .and_then(|r| CellAddress::parse(&r).ok())
                    .map(|a| a.col)
                    .unwrap_or_else(|| last_col.map_or(0, |c| c + 1));
                last_col = Some(col);
                out.cells_before(row, Some(col))?;

                let addr = CellAddress::new(row, col);
                let is_start = matches!(event, Event::Start(_));
                match out.take(addr) {
                    Some(value) => {
                        let style = attribute(e, b"s");
                        out.cell(addr, style.as_deref(), value)?;
                        if is_start {
                            skip_depth = 1;
                        }
                    }
                    None if is_start => out.writer.write_event(Event::Start(e.to_owned()))?,
                    None => out.writer.write_event(Event::Empty(e.to_owned()))?,
                }
            }
            other => out.writer.write_event(other)?,
        }
        buf.clear();
    }

    Ok(out.writer.into_inner())
}

/// Copy a part, leaving out Override and Relationship entries for the calculation chain
fn drop_calc_chain_refs<R: Read>(input: R) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(BufReader::new(input));
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Empty(ref e)
                if matches!(e.name().as_ref(), b"Override" | b"Relationship")
                    && [b"PartName".as_slice(), b"Target".as_slice()]
                        .iter()
                        .filter_map(|k| attribute(e, k))
                        .any(|v| v.ends_with("calcChain.xml")) => {}
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

/// Copy workbook.xml with `fullCalcOnLoad="1"` set on `calcPr`
fn force_full_calc<R: Read>(input: R) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(BufReader::new(input));
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Empty(ref e) if e.name().as_ref() == b"calcPr" => {
                let mut calc = BytesStart::new("calcPr");
                for a in e.attributes().flatten() {
                    if a.key.as_ref() != b"fullCalcOnLoad" {
                        calc.push_attribute(a);
                    }
                }
                calc.push_attribute(("fullCalcOnLoad", "1"));
                writer.write_event(Event::Empty(calc))?;
            }
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn patched(xml: &str, cells: &[(&str, CellValue)]) -> String {
        let values: Vec<(CellAddress, CellValue)> = cells
            .iter()
            .map(|(a, v)| (CellAddress::parse(a).unwrap(), v.clone()))
            .collect();
        let mut rows: BTreeMap<u32, BTreeMap<u16, &CellValue>> = BTreeMap::new();
        for (addr, value) in &values {
            rows.entry(addr.row).or_default().insert(addr.col, value);
        }
        String::from_utf8(patch_worksheet_xml(xml.as_bytes(), rows).unwrap()).unwrap()
    }

    #[test]
    fn test_replaces_cell_keeping_style() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Client</t></is></c><c r="B1" s="3" t="inlineStr"><is><t>Old</t></is></c></row></sheetData></worksheet>"#;
        let out = patched(xml, &[("B1", CellValue::string("Acme"))]);
        assert!(out.contains(r#"<c r="A1" t="inlineStr"><is><t>Client</t></is></c>"#));
        assert!(out.contains(r#"<c r="B1" s="3" t="inlineStr"><is><t xml:space="preserve">Acme</t></is></c>"#));
        assert!(!out.contains("Old"));
    }

    #[test]
    fn test_inserts_cells_and_rows_in_order() {
        let xml = r#"<worksheet><sheetData><row r="2"><c r="B2"><v>1</v></c></row><row r="5"/></sheetData></worksheet>"#;
        let out = patched(
            xml,
            &[
                ("A1", CellValue::Number(7.0)),
                ("A2", CellValue::Number(2.0)),
                ("D2", CellValue::Number(3.0)),
                ("C5", CellValue::Number(4.0)),
                ("A9", CellValue::Number(5.0)),
            ],
        );
        assert_eq!(
            out,
            concat!(
                r#"<worksheet><sheetData>"#,
                r#"<row r="1"><c r="A1"><v>7</v></c></row>"#,
                r#"<row r="2"><c r="A2"><v>2</v></c><c r="B2"><v>1</v></c><c r="D2"><v>3</v></c></row>"#,
                r#"<row r="5"><c r="C5"><v>4</v></c></row>"#,
                r#"<row r="9"><c r="A9"><v>5</v></c></row>"#,
                r#"</sheetData></worksheet>"#
            )
        );
    }

    #[test]
    fn test_empty_sheet_data_is_expanded() {
        let out = patched("<worksheet><sheetData/></worksheet>", &[("B3", CellValue::Boolean(true))]);
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="3"><c r="B3" t="b"><v>1</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_calc_chain_references_dropped() {
        let xml = r#"<Types><Override PartName="/xl/calcChain.xml" ContentType="x"/><Override PartName="/xl/workbook.xml" ContentType="y"/></Types>"#;
        let out = String::from_utf8(drop_calc_chain_refs(xml.as_bytes()).unwrap()).unwrap();
        assert_eq!(out, r#"<Types><Override PartName="/xl/workbook.xml" ContentType="y"/></Types>"#);
    }

    #[test]
    fn test_full_calc_flag() {
        let xml = r#"<workbook><calcPr calcId="191029"/></workbook>"#;
        let out = String::from_utf8(force_full_calc(xml.as_bytes()).unwrap()).unwrap();
        assert_eq!(out, r#"<workbook><calcPr calcId="191029" fullCalcOnLoad="1"/></workbook>"#);
    }
}
