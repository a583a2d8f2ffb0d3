//! Error types for the table engine.
//!
//! Conditions like "cursor is not in a table" are not errors; they are
//! reported as [`crate::table::NotApplicable`]. This enum covers real I/O
//! and parse failures.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort an operation before the document is touched.
#[derive(Debug, Error)]
pub enum Error {
    /// Writing an in-memory buffer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The clipboard could not be read or written.
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// Delimited text could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialized output was not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
