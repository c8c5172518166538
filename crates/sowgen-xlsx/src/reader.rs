//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::address::{CellAddress, CellRange};
use crate::error::{XlsxError, XlsxResult};
use crate::sheet::Worksheet;
use crate::style::Style;
use crate::styles::read_styles_xml;
use crate::value::CellValue;
use crate::workbook::Workbook;

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode control characters in XML:
/// `_x000d_` is CR, `_x000a_` is LF and `_x005f_` an escaped underscore.
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let cell_styles = match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file)?,
            Err(_) => vec![Style::default()],
        };

        let mut workbook = Workbook::new();
        for (name, path) in sheet_paths(&mut archive)? {
            let sheet = workbook.add_sheet(name.as_str())?;
            Self::read_worksheet(&mut archive, &path, sheet, &shared_strings, &cell_styles)?;
            log::debug!("read sheet '{}' ({} cells)", name, sheet.cell_count());
        }

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs (<rPh>) repeat the text in another script
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current_string.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read a worksheet from the archive
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        cell_styles: &[Style],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();

        let mut current: Option<RawCell> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;

        let mut validation_sqref: Option<String> = None;
        let mut in_dv_formula1 = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => current = Some(RawCell::from_element(&e)),
                    b"v" if current.is_some() => in_value = true,
                    b"f" if current.is_some() => in_formula = true,
                    b"t" if current.is_some() => in_inline_text = true,
                    b"dataValidation" => {
                        let is_list = attr(&e, b"type").as_deref() == Some("list");
                        validation_sqref = attr(&e, b"sqref").filter(|_| is_list);
                    }
                    b"formula1" if validation_sqref.is_some() => in_dv_formula1 = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"c" => {
                        RawCell::from_element(&e).apply(worksheet, shared_strings, cell_styles)?;
                    }
                    // <f t="shared" si="0"/> continuation cells carry only a cached value
                    b"f" => {}
                    b"col" => {
                        let min = attr(&e, b"min").and_then(|v| v.parse::<u16>().ok());
                        let max = attr(&e, b"max").and_then(|v| v.parse::<u16>().ok());
                        let width = attr(&e, b"width").and_then(|v| v.parse::<f64>().ok());
                        let custom = attr(&e, b"customWidth").map_or(false, |v| v == "1" || v == "true");
                        if let (Some(min), Some(max), Some(width), true) = (min, max, width, custom) {
                            // Full-sheet <col max="16384"> ranges are not worth expanding
                            for col in min..=max.min(min.saturating_add(255)) {
                                worksheet.set_column_width(col.saturating_sub(1), width);
                            }
                        }
                    }
                    b"mergeCell" => {
                        if let Some(range) = attr(&e, b"ref").and_then(|r| CellRange::parse(&r).ok()) {
                            worksheet.merge_cells(range);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let Some(cell) = current.as_mut() {
                        let text = e
                            .unescape()
                            .map_err(XlsxError::Xml)?
                            .into_owned();
                        if in_value {
                            cell.value.get_or_insert_with(String::new).push_str(&text);
                        } else if in_formula {
                            cell.formula.get_or_insert_with(String::new).push_str(&text);
                        } else if in_inline_text {
                            cell.value.get_or_insert_with(String::new).push_str(&text);
                        }
                    } else if in_dv_formula1 {
                        if let (Some(sqref), Ok(text)) = (validation_sqref.as_deref(), e.unescape()) {
                            for part in sqref.split_whitespace() {
                                if let Ok(range) = CellRange::parse(part) {
                                    worksheet.add_list_validation(range, text.to_string());
                                }
                            }
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(cell) = current.take() {
                            cell.apply(worksheet, shared_strings, cell_styles)?;
                        }
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    b"formula1" => in_dv_formula1 = false,
                    b"dataValidation" => validation_sqref = None,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// A `<c>` element as read, before type resolution
#[derive(Debug, Default)]
struct RawCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
}

impl RawCell {
    fn from_element(e: &BytesStart<'_>) -> Self {
        Self {
            reference: attr(e, b"r"),
            cell_type: attr(e, b"t"),
            style: attr(e, b"s").and_then(|s| s.parse().ok()),
            value: None,
            formula: None,
        }
    }

    fn apply(
        self,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        styles: &[Style],
    ) -> XlsxResult<()> {
        let cell_ref = match self.reference {
            Some(r) => r,
            // Cells without r= follow the previous one; the writers we read always emit it
            None => return Ok(()),
        };
        let addr = CellAddress::parse(&cell_ref)
            .map_err(|e| XlsxError::Parse(format!("Invalid cell reference '{}': {}", cell_ref, e)))?;

        let typed = match self.value.as_deref() {
            Some(v) => Some(typed_value(self.cell_type.as_deref(), v, shared_strings)?),
            None => None,
        };

        let value = match (self.formula, typed) {
            (Some(f), cached) if !f.is_empty() => CellValue::Formula {
                text: f.trim_start_matches('=').to_string(),
                cached: cached.map(Box::new),
            },
            (_, Some(v)) => v,
            (_, None) => CellValue::Empty,
        };

        if let Some(idx) = self.style.filter(|s| *s != 0) {
            let style = styles
                .get(idx as usize)
                .ok_or_else(|| XlsxError::Parse(format!("Style index {} out of bounds", idx)))?;
            worksheet.set(addr, value, style);
        } else if !matches!(value, CellValue::Empty) {
            worksheet.set_value(addr, value);
        }
        Ok(())
    }
}

fn typed_value(cell_type: Option<&str>, value: &str, shared_strings: &[String]) -> XlsxResult<CellValue> {
    Ok(match cell_type {
        Some("s") => {
            let idx: usize = value
                .trim()
                .parse()
                .map_err(|_| XlsxError::Parse(format!("Invalid shared string index: {}", value)))?;
            let s = shared_strings
                .get(idx)
                .ok_or_else(|| XlsxError::Parse(format!("Shared string index {} out of bounds", idx)))?;
            CellValue::String(s.clone())
        }
        Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
        Some("inlineStr") | Some("str") => CellValue::String(decode_excel_escapes(value)),
        // Error values (#REF! etc.) read as their text
        Some("e") => CellValue::String(value.to_string()),
        None | Some("n") => match value.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::String(value.to_string()),
        },
        Some(_) => CellValue::String(value.to_string()),
    })
}

/// Sheet names paired with their part paths, in workbook order
pub(crate) fn sheet_paths<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> XlsxResult<Vec<(String, String)>> {
    let sheets = read_workbook_sheets(archive)?;
    let rels = read_workbook_rels(archive)?;
    Ok(sheets
        .into_iter()
        .filter_map(|(name, r_id)| rels.get(&r_id).map(|path| (name, path.clone())))
        .collect())
}

/// Read workbook.xml to get sheet names and rIds
fn read_workbook_sheets<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> XlsxResult<Vec<(String, String)>> {
    let file = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(r_id)) = (attr(&e, b"name"), attr(&e, b"r:id")) {
                    sheets.push((name, r_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Read workbook.xml.rels to get worksheet part paths by rId
fn read_workbook_rels<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> XlsxResult<HashMap<String, String>> {
    let file = archive
        .by_name("xl/_rels/workbook.xml.rels")
        .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let id = attr(&e, b"Id");
                let target = attr(&e, b"Target");
                let rel_type = attr(&e, b"Type");
                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    if rel_type.ends_with("/worksheet") {
                        // Target is relative to xl/ unless absolute
                        let full_path = match target.strip_prefix('/') {
                            Some(abs) => abs.to_string(),
                            None => format!("xl/{}", target),
                        };
                        rels.insert(id, full_path);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}
