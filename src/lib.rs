// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. table::TableModel)
    clippy::module_name_repetitions
)]

//! # pipetable
//!
//! A table engine for pipe-delimited tables in org and markdown documents.
//!
//! pipetable works on plain text lines and provides:
//! - Display-width aware alignment (CJK, emoji, joiners)
//! - Row and column edits that rewrite the whole table in one replace
//! - Row sorting and outline entry sorting
//! - `<l>`, `<c10>`, `<8>` column cookies for alignment and width
//! - Non-destructive truncation of max-width columns
//! - CSV/TSV/HTML/LaTeX export and clipboard import
//!
//! ## Architecture
//!
//! Tables are never cached. Each operation locates a [`table::Table`]
//! snapshot from the current lines, computes one [`table::Edit`], and the
//! [`session::Session`] applies it to the [`editor::EditorBuffer`].
//!
//! ## Modules
//!
//! - [`width`]: Display width of characters and strings
//! - [`table`]: Tokenizer, layout, edits, export and projection
//! - [`outline`]: Heading parsing and entry sorting
//! - [`sort`]: Sort keys and the shared comparator
//! - [`editor`]: Rope-backed host document
//! - [`session`]: Per-document engine state
//! - [`config`]: Config files and flag merging

pub mod config;
pub mod editor;
pub mod error;
pub mod outline;
pub mod session;
pub mod sort;
pub mod table;
pub mod width;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::editor::EditorBuffer;
    pub use crate::error::{Error, Result};
    pub use crate::session::{Clipboard, MemoryClipboard, Outcome, Session};
    pub use crate::table::{Edit, NotApplicable, Projection, Syntax, Table};
}
