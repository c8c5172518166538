//! Error type for the sowgen pipelines

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the build, render and clone pipelines
#[derive(Debug, Error)]
pub enum Error {
    /// Input could not be turned into a content model
    #[error(transparent)]
    Input(#[from] sowgen_core::Error),

    /// Spreadsheet container error
    #[error("{}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: sowgen_xlsx::XlsxError,
    },

    /// Document container or template error
    #[error(transparent)]
    Document(#[from] sowgen_docx::DocxError),

    /// An output file could not be written
    #[error("failed to write '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn workbook<P: Into<PathBuf>>(path: P, source: sowgen_xlsx::XlsxError) -> Self {
        Error::Workbook {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn output<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Output {
            path: path.into(),
            source,
        }
    }
}
