//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::style::{
    Alignment, BorderStyle, Color, FillStyle, FontStyle, HorizontalAlignment, Style,
};
use crate::workbook::Workbook;

/// First id available for custom number formats
const FIRST_CUSTOM_NUMFMT: u32 = 164;

// === Writing ===

#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Global, deduplicated styles. Index corresponds to the cellXfs index (xfId).
    styles: Vec<Style>,
    /// Per-worksheet mapping: local worksheet style index -> global xfId.
    sheet_maps: Vec<HashMap<u32, u32>>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles: Vec<Style> = vec![Style::default()];
        let mut style_to_xf: HashMap<Style, u32> = HashMap::new();
        style_to_xf.insert(Style::default(), 0);

        let mut sheet_maps = Vec::with_capacity(workbook.sheet_count());

        for sheet in workbook.sheets() {
            let mut map: HashMap<u32, u32> = HashMap::new();
            map.insert(0, 0);

            for (_, cell) in sheet.iter_cells() {
                let local_idx = cell.style_index;
                if map.contains_key(&local_idx) {
                    continue;
                }
                let style = sheet
                    .style_pool()
                    .get(local_idx)
                    .cloned()
                    .unwrap_or_default();
                let xf_id = *style_to_xf.entry(style.clone()).or_insert_with(|| {
                    styles.push(style);
                    styles.len() as u32 - 1
                });
                map.insert(local_idx, xf_id);
            }

            sheet_maps.push(map);
        }

        Self { styles, sheet_maps }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut font_ids: HashMap<FontStyle, u32> = HashMap::new();
        let mut fonts: Vec<FontStyle> = vec![FontStyle::default()];
        font_ids.insert(FontStyle::default(), 0);

        // Excel requires the first two fills to be: none and gray125
        let mut fill_ids: HashMap<Color, u32> = HashMap::new();
        let mut fills: Vec<Color> = Vec::new();

        let mut numfmt_ids: HashMap<String, u32> = HashMap::new();
        let mut numfmts: Vec<(u32, String)> = Vec::new();

        let mut resolved = Vec::with_capacity(self.styles.len());
        for style in &self.styles {
            let font_id = *font_ids.entry(style.font.clone()).or_insert_with(|| {
                fonts.push(style.font.clone());
                fonts.len() as u32 - 1
            });

            let fill_id = match style.fill {
                FillStyle::None => 0,
                FillStyle::Solid(color) => *fill_ids.entry(color).or_insert_with(|| {
                    fills.push(color);
                    fills.len() as u32 + 1
                }),
            };

            let border_id = match style.border {
                BorderStyle::None => 0,
                BorderStyle::Thin => 1,
            };

            let num_fmt_id = match &style.number_format {
                None => 0,
                Some(code) => *numfmt_ids.entry(code.clone()).or_insert_with(|| {
                    let id = FIRST_CUSTOM_NUMFMT + numfmts.len() as u32;
                    numfmts.push((id, code.clone()));
                    id
                }),
            };

            resolved.push(ResolvedXfIds {
                font_id,
                fill_id,
                border_id,
                num_fmt_id,
            });
        }

        let mut xml = String::new();
        xml.push_str(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml_attr(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!("\n  <fills count=\"{}\">", fills.len() + 2));
        xml.push_str("\n    <fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("\n    <fill><patternFill patternType=\"gray125\"/></fill>");
        for color in &fills {
            xml.push_str(&format!(
                "\n    <fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
                color.to_argb_hex()
            ));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(
            r#"
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color indexed="64"/></left><right style="thin"><color indexed="64"/></right><top style="thin"><color indexed="64"/></top><bottom style="thin"><color indexed="64"/></bottom><diagonal/></border>
  </borders>"#,
        );

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(&resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );
        xml
    }
}

fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if let Some(color) = font.color {
        s.push_str(&format!("<color rgb=\"{}\"/>", color.to_argb_hex()));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_xml_attr(&font.name)));
    s.push_str("</font>");
    s
}

fn write_alignment(al: &Alignment) -> String {
    if al == &Alignment::default() {
        return String::new();
    }
    let mut s = String::from("<alignment");
    if al.horizontal != HorizontalAlignment::General {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.xlsx_name()));
    }
    if al.vertical_center {
        s.push_str(" vertical=\"center\"");
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if style.font != FontStyle::default() {
        attrs.push_str(" applyFont=\"1\"");
    }
    if style.fill != FillStyle::None {
        attrs.push_str(" applyFill=\"1\"");
    }
    if style.border != BorderStyle::None {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if style.alignment != Alignment::default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id, attrs
    );
    let alignment_xml = write_alignment(&style.alignment);
    if alignment_xml.is_empty() {
        s.push_str("/>");
    } else {
        s.push('>');
        s.push_str(&alignment_xml);
        s.push_str("</xf>");
    }
    s
}

// === Reading ===

/// Format codes of the builtin date formats, which styles.xml never spells out
fn builtin_date_format(id: u32) -> Option<&'static str> {
    match id {
        14 => Some("m/d/yyyy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        22 => Some("m/d/yyyy h:mm"),
        _ => None,
    }
}

/// Parse the cellXfs of a styles.xml into resolved [`Style`]s
///
/// Only what the workbook model carries is kept: font weight/size/colour,
/// solid fill colour, any-thin border, alignment and custom number formats.
pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<Vec<Style>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();

    let mut numfmts: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<FontStyle> = Vec::new();
    let mut fills: Vec<FillStyle> = Vec::new();
    let mut borders: Vec<BorderStyle> = Vec::new();
    let mut cell_styles: Vec<Style> = Vec::new();

    let mut current_font: Option<FontStyle> = None;
    let mut current_fill: Option<FillStyle> = None;
    let mut solid_pattern = false;
    let mut current_border: Option<BorderStyle> = None;
    let mut current_xf: Option<Style> = None;
    let mut in_cell_xfs = false;

    loop {
        let event = xml_reader.read_event_into(&mut buf);
        let (e, is_empty) = match event {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"font" => fonts.extend(current_font.take()),
                    b"fill" => fills.extend(current_fill.take()),
                    b"border" => borders.extend(current_border.take()),
                    b"xf" => cell_styles.extend(current_xf.take()),
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                }
                buf.clear();
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {
                buf.clear();
                continue;
            }
        };

        match e.name().as_ref() {
            b"numFmt" => {
                let id = attr_u32(&e, b"numFmtId");
                let code = attr_string(&e, b"formatCode");
                if let (Some(id), Some(code)) = (id, code) {
                    numfmts.insert(id, code);
                }
            }
            b"font" => {
                let font = FontStyle {
                    size: 11.0,
                    ..FontStyle::default()
                };
                if is_empty {
                    fonts.push(font);
                } else {
                    current_font = Some(font);
                }
            }
            b"b" => {
                if let Some(font) = current_font.as_mut() {
                    font.bold = attr_string(&e, b"val").map_or(true, |v| v != "0");
                }
            }
            b"i" => {
                if let Some(font) = current_font.as_mut() {
                    font.italic = attr_string(&e, b"val").map_or(true, |v| v != "0");
                }
            }
            b"sz" => {
                if let Some(font) = current_font.as_mut() {
                    if let Some(size) = attr_string(&e, b"val").and_then(|v| v.parse().ok()) {
                        font.size = size;
                    }
                }
            }
            b"name" => {
                if let Some(font) = current_font.as_mut() {
                    if let Some(name) = attr_string(&e, b"val") {
                        font.name = name;
                    }
                }
            }
            b"color" => {
                if let Some(font) = current_font.as_mut() {
                    font.color = attr_string(&e, b"rgb").and_then(|v| Color::from_hex(&v));
                }
            }
            b"fill" => {
                solid_pattern = false;
                if is_empty {
                    fills.push(FillStyle::None);
                } else {
                    current_fill = Some(FillStyle::None);
                }
            }
            b"patternFill" => {
                solid_pattern = attr_string(&e, b"patternType").as_deref() == Some("solid");
            }
            b"fgColor" => {
                if let Some(fill) = current_fill.as_mut() {
                    if solid_pattern {
                        if let Some(color) = attr_string(&e, b"rgb").and_then(|v| Color::from_hex(&v)) {
                            *fill = FillStyle::Solid(color);
                        }
                    }
                }
            }
            b"border" => {
                if is_empty {
                    borders.push(BorderStyle::None);
                } else {
                    current_border = Some(BorderStyle::None);
                }
            }
            b"left" | b"right" | b"top" | b"bottom" => {
                if let Some(border) = current_border.as_mut() {
                    if attr_string(&e, b"style").is_some() {
                        *border = BorderStyle::Thin;
                    }
                }
            }
            b"cellXfs" => in_cell_xfs = !is_empty,
            b"xf" if in_cell_xfs => {
                let num_fmt_id = attr_u32(&e, b"numFmtId").unwrap_or(0);
                let idx = |key: &[u8]| attr_u32(&e, key).unwrap_or(0) as usize;
                let style = Style {
                    font: fonts.get(idx(b"fontId")).cloned().unwrap_or_default(),
                    fill: fills.get(idx(b"fillId")).copied().unwrap_or_default(),
                    border: borders.get(idx(b"borderId")).copied().unwrap_or_default(),
                    alignment: Alignment::default(),
                    number_format: numfmts
                        .get(&num_fmt_id)
                        .cloned()
                        .or_else(|| builtin_date_format(num_fmt_id).map(str::to_string)),
                };
                if is_empty {
                    cell_styles.push(style);
                } else {
                    current_xf = Some(style);
                }
            }
            b"alignment" => {
                if let Some(style) = current_xf.as_mut() {
                    if let Some(h) = attr_string(&e, b"horizontal") {
                        style.alignment.horizontal = HorizontalAlignment::from_xlsx(&h);
                    }
                    style.alignment.vertical_center =
                        attr_string(&e, b"vertical").as_deref() == Some("center");
                    style.alignment.wrap_text =
                        attr_string(&e, b"wrapText").as_deref() == Some("1");
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if cell_styles.is_empty() {
        cell_styles.push(Style::default());
    }
    Ok(cell_styles)
}

fn attr_string(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

fn attr_u32(e: &BytesStart<'_>, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::CellAddress;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_styles_roundtrip_through_xml() {
        let header = Style::new()
            .bold(true)
            .font_color(Color::WHITE)
            .fill_color(Color::rgb(0x4A, 0x47, 0x78))
            .thin_border()
            .align(HorizontalAlignment::Center)
            .vertical_center()
            .wrap();
        let money = Style::new().number_format("$#,##0").thin_border();

        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        sheet.set(CellAddress::new(0, 0), "Practice", &header);
        sheet.set(CellAddress::new(1, 0), 1.0, &money);

        let table = XlsxStyleTable::build(&wb);
        let xml = table.to_styles_xml();
        let parsed = read_styles_xml(xml.as_bytes()).unwrap();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[table.xf_id_for(0, 1) as usize], header);
        assert_eq!(parsed[table.xf_id_for(0, 2) as usize], money);
    }

    #[test]
    fn test_builtin_date_format_is_spelled_out() {
        let xml = r#"<styleSheet><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
        let parsed = read_styles_xml(xml.as_bytes()).unwrap();
        assert!(!parsed[0].is_date());
        assert!(parsed[1].is_date());
    }
}
