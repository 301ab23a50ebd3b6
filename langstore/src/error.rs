//! All error types for the langstore crate.
//!
//! These are returned from all fallible operations (parsing, flattening, merging,
//! serialization). None of them is transient: every input is fully in memory, so
//! nothing is retried internally and callers receive the error unchanged.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed native syntax, with the parser's diagnostic.
    #[error("{format} parse error{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Parse {
        format: String,
        message: String,
        line: Option<usize>,
    },

    /// A document node has a type or shape the flattening engine does not understand.
    #[error("structure error at `{path}`: {message}")]
    Structure { path: String, message: String },

    #[error("a template is required for this merge")]
    MissingTemplate,

    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("invalid unit id `{0}`")]
    InvalidUnitId(String),

    #[error("duplicate unit `{0}`")]
    DuplicateUnit(String),

    #[error("unit `{0}` not found")]
    UnitNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new parse error for `format`.
    pub fn parse(format: impl Into<String>, message: impl Into<String>, line: Option<usize>) -> Self {
        Error::Parse {
            format: format.into(),
            message: message.into(),
            line,
        }
    }

    /// Creates a new structure error located at `path`.
    pub fn structure(path: impl ToString, message: impl Into<String>) -> Self {
        Error::Structure {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Converts a byte offset into a 1-based line number.
pub(crate) fn line_of(raw: &str, offset: usize) -> usize {
    let end = offset.min(raw.len());
    raw.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
