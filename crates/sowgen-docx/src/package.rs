//! DOCX package: the ordered set of parts inside the zip container

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use crate::error::{DocxError, DocxResult};
use crate::template;
use crate::xml::{self, Element};

/// Main document part
pub const DOCUMENT_PART: &str = "word/document.xml";

/// A word-processing package held in memory
#[derive(Debug, Clone)]
pub struct DocxPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    /// The embedded SOW template
    pub fn builtin() -> Self {
        Self {
            parts: template::PARTS
                .iter()
                .map(|(name, body)| (name.to_string(), body.as_bytes().to_vec()))
                .collect(),
        }
    }

    /// Open a user-supplied template
    pub fn open<P: AsRef<Path>>(path: P) -> DocxResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DocxError::TemplateMissing {
            path: path.to_path_buf(),
            source,
        })?;
        let package = Self::read(BufReader::new(file), &path.display().to_string())?;
        log::debug!("opened template '{}' ({} parts)", path.display(), package.parts.len());
        Ok(package)
    }

    /// Read a package from bytes; `origin` names it in errors
    pub fn from_bytes(bytes: &[u8], origin: &str) -> DocxResult<Self> {
        Self::read(Cursor::new(bytes), origin)
    }

    fn read<R: Read + Seek>(reader: R, origin: &str) -> DocxResult<Self> {
        let corrupt = |reason: String| DocxError::TemplateCorrupt {
            origin: origin.to_string(),
            reason,
        };

        let mut archive = zip::ZipArchive::new(reader).map_err(|e| corrupt(e.to_string()))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| corrupt(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let mut body = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut body)
                .map_err(|e| corrupt(format!("{}: {}", file.name(), e)))?;
            parts.push((file.name().to_string(), body));
        }

        let package = Self { parts };
        for required in ["[Content_Types].xml", DOCUMENT_PART] {
            if package.part(required).is_none() {
                return Err(corrupt(format!("missing part {}", required)));
            }
        }
        // A document that does not parse cannot be rendered
        package
            .xml_part(DOCUMENT_PART)
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(package)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body.as_slice())
    }

    /// Replace a part, or append it when new
    pub fn set_part<S: Into<String>>(&mut self, name: S, body: Vec<u8>) {
        let name = name.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = body,
            None => self.parts.push((name, body)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// Parts that can carry placeholders: the body, then headers and footers
    pub fn content_part_names(&self) -> Vec<String> {
        let mut names = vec![DOCUMENT_PART.to_string()];
        names.extend(
            self.part_names()
                .filter(|n| is_header_or_footer(n))
                .map(str::to_string),
        );
        names
    }

    /// Parse a part into a tree
    pub fn xml_part(&self, name: &str) -> DocxResult<Element> {
        let body = self.part(name).ok_or_else(|| DocxError::Malformed {
            part: name.to_string(),
            reason: "no such part".into(),
        })?;
        xml::parse(body, name)
    }

    pub fn set_xml_part(&mut self, name: &str, root: &Element) {
        self.set_part(name, root.to_xml().into_bytes());
    }

    /// Plain text of the body, one line per paragraph (table cells included)
    pub fn document_text(&self) -> DocxResult<String> {
        let root = self.xml_part(DOCUMENT_PART)?;
        let mut lines = Vec::new();
        collect_paragraph_text(&root, &mut lines);
        Ok(lines.join("\n"))
    }

    /// Write the package as a zip container
    pub fn write<W: Write + Seek>(&self, writer: W) -> DocxResult<()> {
        let mut zip = zip::ZipWriter::new(writer);
        for (name, body) in &self.parts {
            zip.start_file(
                name.clone(),
                zip::write::SimpleFileOptions::default()
                    .compression_method(zip::CompressionMethod::Deflated),
            )?;
            zip.write_all(body)?;
        }
        zip.finish()?;
        Ok(())
    }

    /// Write to `path` through a temp file in the same directory
    pub fn save<P: AsRef<Path>>(&self, path: P) -> DocxResult<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        self.write(tmp.as_file_mut())?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(path)?;
        log::debug!("wrote document '{}'", path.display());
        Ok(())
    }
}

fn is_header_or_footer(name: &str) -> bool {
    name.strip_prefix("word/")
        .filter(|rest| !rest.contains('/'))
        .map_or(false, |rest| {
            (rest.starts_with("header") || rest.starts_with("footer")) && rest.ends_with(".xml")
        })
}

fn collect_paragraph_text(el: &Element, lines: &mut Vec<String>) {
    for child in el.elements() {
        if child.name == "w:p" {
            lines.push(child.descendant_text("w:t"));
        } else {
            collect_paragraph_text(child, lines);
        }
    }
}
