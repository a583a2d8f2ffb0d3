//! Pipe-table engine.
//!
//! This module handles:
//! - Tokenizing table rows without splitting on escaped pipes
//! - Locating tables and computing column layout
//! - Structural edits (rows, columns, sorting)
//! - Export to CSV/TSV/HTML/LaTeX and clipboard import
//! - Truncation projections for max-width columns

pub mod cookie;
mod export;
mod model;
pub mod ops;
pub mod tokenizer;
mod truncate;

pub use export::{Delimiter, ExportFormat, detect_delimiter, export, import, parse_pasted};
pub use model::{ColumnSpec, Row, RowKind, Table, find_named};
pub use ops::{
    Edit, HorizontalDirection, NotApplicable, RowSortKind, VerticalDirection, column_offset,
};
pub use truncate::{HideRange, Marker, Projection, project};

use std::path::Path;

use serde::Serialize;

/// Table flavor, which decides how separator rows are written.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// `|---+---|` separators.
    #[default]
    Org,
    /// `|---|---|` separators with optional `:` alignment markers.
    Markdown,
}

impl Syntax {
    /// Guess the syntax from a file extension. Anything unknown is org.
    pub fn for_path(path: &Path) -> Self {
        let is_markdown = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "md" | "markdown" | "mdown" | "mkd"
                )
            });
        if is_markdown { Self::Markdown } else { Self::Org }
    }
}
