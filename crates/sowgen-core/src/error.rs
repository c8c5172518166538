//! Error types for sowgen-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading inputs or building a content model
#[derive(Debug, Error)]
pub enum Error {
    /// An input file could not be read
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input document is not valid JSON for the expected schema
    #[error("malformed JSON in '{origin}': {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A sheet the builder cannot work without is absent
    #[error("'{file}': required sheet '{sheet}' is missing")]
    MissingSheet { file: String, sheet: String },

    /// A required header cell is empty
    #[error("'{file}': required field '{field}' (sheet '{sheet}', cell {cell}) is empty")]
    MissingField {
        file: String,
        sheet: String,
        cell: String,
        field: &'static str,
    },

    /// No rate is known for a practice/role pair
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl Error {
    /// Wrap a JSON error with the name of the document it came from
    pub fn json<S: Into<String>>(origin: S, source: serde_json::Error) -> Self {
        Error::Json {
            origin: origin.into(),
            source,
        }
    }
}

/// Rate table miss for a practice/role combination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no rate defined for practice '{practice}' and role '{role}'")]
pub struct LookupError {
    pub practice: String,
    pub role: String,
}
