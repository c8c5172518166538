//! DOCX error types

use std::path::PathBuf;

use thiserror::Error;

/// Result type for DOCX operations
pub type DocxResult<T> = std::result::Result<T, DocxError>;

/// Errors that can occur while loading, rendering or saving a document
#[derive(Debug, Error)]
pub enum DocxError {
    /// Template file does not exist or cannot be opened
    #[error("template not found: {}", path.display())]
    TemplateMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template opened but is not a usable word-processing package
    #[error("template {origin} is corrupt: {reason}")]
    TemplateCorrupt { origin: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A part could not be parsed into a tree
    #[error("Malformed part {part}: {reason}")]
    Malformed { part: String, reason: String },
}

impl From<tempfile::PersistError> for DocxError {
    fn from(e: tempfile::PersistError) -> Self {
        DocxError::Io(e.error)
    }
}
