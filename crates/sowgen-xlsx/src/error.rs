//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading, writing or patching
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Malformed A1-style reference
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Sheet lookup by name failed
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Formula could not be evaluated
    #[error("Cannot evaluate formula in {cell}: {reason}")]
    Formula { cell: String, reason: String },
}

impl From<tempfile::PersistError> for XlsxError {
    fn from(e: tempfile::PersistError) -> Self {
        XlsxError::Io(e.error)
    }
}
