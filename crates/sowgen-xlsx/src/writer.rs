//! XLSX writer

use std::io::{Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use crate::sheet::Worksheet;
use crate::styles::XlsxStyleTable;
use crate::value::CellValue;
use crate::workbook::Workbook;

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    ///
    /// The package is written to a temporary file in the destination
    /// directory and renamed over `path` only once complete.
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        Self::write(workbook, tmp.as_file_mut())?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path)?;
        log::debug!("wrote workbook '{}'", path.display());
        Ok(())
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "a workbook needs at least one sheet".into(),
            ));
        }

        let mut zip = zip::ZipWriter::new(writer);
        let style_table = XlsxStyleTable::build(workbook);

        Self::write_content_types(&mut zip, workbook)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;

        zip.start_file("xl/styles.xml", zip::write::SimpleFileOptions::default())?;
        zip.write_all(style_table.to_styles_xml().as_bytes())?;

        for (i, sheet) in workbook.sheets().iter().enumerate() {
            zip.start_file(
                format!("xl/worksheets/sheet{}.xml", i + 1),
                zip::write::SimpleFileOptions::default(),
            )?;
            let xml = Self::worksheet_xml(sheet, i, &style_table);
            zip.write_all(xml.as_bytes())?;
        }

        zip.finish()?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        content.push_str("\n</Types>");
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in workbook.sheets().iter().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        // Ask consumers to recalculate on open; cached values are still written
        content.push_str(
            r#"
    </sheets>
    <calcPr calcId="191029" fullCalcOnLoad="1"/>
</workbook>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            workbook.sheet_count() + 1
        ));

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn worksheet_xml(sheet: &Worksheet, index: usize, style_table: &XlsxStyleTable) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        let widths: Vec<(u16, f64)> = sheet.column_widths().collect();
        if !widths.is_empty() {
            content.push_str("\n    <cols>");
            for (col, width) in widths {
                content.push_str(&format!(
                    "\n        <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
                    col + 1,
                    col + 1,
                    width
                ));
            }
            content.push_str("\n    </cols>");
        }

        content.push_str("\n    <sheetData>");

        // Sparse, row-major
        let mut current_row: Option<u32> = None;
        for (addr, cell) in sheet.iter_cells() {
            let xf_id = style_table.xf_id_for(index, cell.style_index);
            if matches!(cell.value, CellValue::Empty) && xf_id == 0 {
                continue;
            }

            if current_row != Some(addr.row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", addr.row + 1));
                current_row = Some(addr.row);
            }

            let cell_ref = addr.to_a1_string();
            let style_attr = if xf_id != 0 {
                format!(" s=\"{}\"", xf_id)
            } else {
                String::new()
            };
            content.push_str("\n            ");
            content.push_str(&cell_xml(&cell_ref, &style_attr, &cell.value));
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>");

        let merged = sheet.merged_regions();
        if !merged.is_empty() {
            content.push_str(&format!("\n    <mergeCells count=\"{}\">", merged.len()));
            for range in merged {
                content.push_str(&format!("\n        <mergeCell ref=\"{}\"/>", range));
            }
            content.push_str("\n    </mergeCells>");
        }

        let validations = sheet.list_validations();
        if !validations.is_empty() {
            content.push_str(&format!(
                "\n    <dataValidations count=\"{}\">",
                validations.len()
            ));
            for validation in validations {
                let source = validation.source.trim_start_matches('=');
                content.push_str(&format!(
                    "\n        <dataValidation type=\"list\" allowBlank=\"1\" showInputMessage=\"1\" showErrorMessage=\"1\" sqref=\"{}\">\n            <formula1>{}</formula1>\n        </dataValidation>",
                    validation.range,
                    escape_xml(source)
                ));
            }
            content.push_str("\n    </dataValidations>");
        }

        content.push_str("\n</worksheet>");
        content
    }
}

/// Serialize one `<c>` element
pub(crate) fn cell_xml(cell_ref: &str, style_attr: &str, value: &CellValue) -> String {
    match value {
        CellValue::Empty => format!("<c r=\"{}\"{}/>", cell_ref, style_attr),
        CellValue::Number(n) => format!("<c r=\"{}\"{}><v>{}</v></c>", cell_ref, style_attr, n),
        CellValue::String(s) => format!(
            "<c r=\"{}\"{} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            cell_ref,
            style_attr,
            escape_xml(s)
        ),
        CellValue::Boolean(b) => format!(
            "<c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
            cell_ref,
            style_attr,
            if *b { 1 } else { 0 }
        ),
        CellValue::Formula { text, cached } => {
            let formula = escape_xml(text.trim_start_matches('='));
            match cached.as_deref() {
                Some(CellValue::Number(n)) => format!(
                    "<c r=\"{}\"{}><f>{}</f><v>{}</v></c>",
                    cell_ref, style_attr, formula, n
                ),
                Some(CellValue::String(s)) => format!(
                    "<c r=\"{}\"{} t=\"str\"><f>{}</f><v>{}</v></c>",
                    cell_ref,
                    style_attr,
                    formula,
                    escape_xml(s)
                ),
                Some(CellValue::Boolean(b)) => format!(
                    "<c r=\"{}\"{} t=\"b\"><f>{}</f><v>{}</v></c>",
                    cell_ref,
                    style_attr,
                    formula,
                    if *b { 1 } else { 0 }
                ),
                _ => format!("<c r=\"{}\"{}><f>{}</f></c>", cell_ref, style_attr, formula),
            }
        }
    }
}

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_xml_variants() {
        assert_eq!(cell_xml("A1", "", &CellValue::Number(230.0)), "<c r=\"A1\"><v>230</v></c>");
        assert_eq!(
            cell_xml("B1", " s=\"2\"", &CellValue::string("R&D")),
            "<c r=\"B1\" s=\"2\" t=\"inlineStr\"><is><t xml:space=\"preserve\">R&amp;D</t></is></c>"
        );
        assert_eq!(
            cell_xml(
                "M7",
                "",
                &CellValue::formula_with_value("=F7*L7", CellValue::Number(44160.0))
            ),
            "<c r=\"M7\"><f>F7*L7</f><v>44160</v></c>"
        );
        assert_eq!(
            cell_xml("M8", "", &CellValue::formula("SUM(M7:M7)")),
            "<c r=\"M8\"><f>SUM(M7:M7)</f></c>"
        );
    }

    #[test]
    fn test_empty_workbook_rejected() {
        let mut buf = std::io::Cursor::new(Vec::new());
        assert!(XlsxWriter::write(&Workbook::new(), &mut buf).is_err());
    }
}
