//! Host document for table and outline operations.
//!
//! Provides a rope-backed, line-indexed buffer with a cursor and an
//! optional line selection.

mod buffer;

pub use buffer::{Cursor, EditorBuffer};
