//! Per-document engine state.
//!
//! A [`Session`] owns the host document, the clipboard and the resolved
//! configuration for one open file. Every mutating call locates what it
//! needs from the current text, computes one [`Edit`] and applies it with a
//! single line-range replace, so a failure before that point leaves the
//! document untouched.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::editor::EditorBuffer;
use crate::error::{Error, Result};
use crate::outline::{self, EntrySort, SortKey};
use crate::table::{
    self, Edit, ExportFormat, HorizontalDirection, NotApplicable, Projection, RowSortKind,
    Syntax, Table, VerticalDirection, ops,
};

/// Text transfer to and from the host's clipboard.
pub trait Clipboard {
    /// Current clipboard text.
    ///
    /// # Errors
    /// Returns [`Error::Clipboard`] if the clipboard cannot be read.
    fn read(&mut self) -> Result<String>;

    /// Replace the clipboard text.
    ///
    /// # Errors
    /// Returns [`Error::Clipboard`] if the clipboard cannot be written.
    fn write(&mut self, text: &str) -> Result<()>;
}

/// A clipboard that lives in memory, for tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            contents: Some(text.to_string()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn read(&mut self) -> Result<String> {
        self.contents
            .clone()
            .ok_or_else(|| Error::Clipboard("clipboard is empty".to_string()))
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Result of a mutating operation as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct Outcome {
    pub applied: bool,
    pub message: Option<String>,
}

impl Outcome {
    pub const fn applied() -> Self {
        Self {
            applied: true,
            message: None,
        }
    }

    pub fn applied_with(message: impl Into<String>) -> Self {
        Self {
            applied: true,
            message: Some(message.into()),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            applied: false,
            message: Some(message.into()),
        }
    }
}

impl From<NotApplicable> for Outcome {
    fn from(reason: NotApplicable) -> Self {
        debug!(%reason, "operation not applicable");
        Self::skipped(reason.to_string())
    }
}

/// Holds back projection recomputation until edits go quiet.
#[derive(Debug, Clone)]
pub struct ProjectionDebouncer {
    delay_ms: u64,
    pending: Option<u64>,
}

impl ProjectionDebouncer {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Record a change. Later changes push the deadline back.
    pub const fn queue(&mut self, now_ms: u64) {
        self.pending = Some(now_ms);
    }

    /// True once, when the quiet period since the last change has passed.
    pub fn take_ready(&mut self, now_ms: u64) -> bool {
        let Some(queued_at) = self.pending else {
            return false;
        };
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub const fn cancel(&mut self) {
        self.pending = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Engine state for one open document.
pub struct Session {
    buffer: EditorBuffer,
    syntax: Syntax,
    config: EngineConfig,
    clipboard: Box<dyn Clipboard>,
    debouncer: ProjectionDebouncer,
}

impl Session {
    pub fn new(
        buffer: EditorBuffer,
        syntax: Syntax,
        config: EngineConfig,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let debouncer = ProjectionDebouncer::new(config.debounce_ms);
        Self {
            buffer,
            syntax,
            config,
            clipboard,
            debouncer,
        }
    }

    /// Session over `text` with default settings and an in-memory clipboard.
    pub fn from_text(text: &str, syntax: Syntax) -> Self {
        Self::new(
            EditorBuffer::from_text(text),
            syntax,
            EngineConfig::default(),
            Box::new(MemoryClipboard::default()),
        )
    }

    pub const fn buffer(&self) -> &EditorBuffer {
        &self.buffer
    }

    pub const fn buffer_mut(&mut self) -> &mut EditorBuffer {
        &mut self.buffer
    }

    pub const fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Table under the cursor with the cursor's row and column in it.
    fn table_at_cursor(&self) -> std::result::Result<(Table, usize, usize), NotApplicable> {
        let cursor = self.buffer.cursor();
        let lines = self.buffer.lines();
        let table =
            Table::locate(&lines, cursor.line, self.syntax).ok_or(NotApplicable::NoTable)?;
        let row = table
            .row_at_line(cursor.line)
            .ok_or(NotApplicable::NoTable)?;
        let column = table.column_at(&lines[cursor.line], cursor.col);
        debug!(
            start = table.start_line,
            end = table.end_line,
            row,
            column,
            "table at cursor"
        );
        Ok((table, row, column))
    }

    fn apply(&mut self, edit: &Edit) {
        let cursor_byte = edit.cursor_byte();
        self.buffer.replace_lines(edit.range.clone(), &edit.lines);
        self.buffer.move_to(edit.cursor_line, cursor_byte);
        debug!(
            start = edit.range.start,
            end = edit.range.end,
            lines = edit.lines.len(),
            "applied edit"
        );
    }

    fn run<F>(&mut self, op: F) -> Outcome
    where
        F: FnOnce(&Table, usize, usize) -> std::result::Result<Edit, NotApplicable>,
    {
        match self
            .table_at_cursor()
            .and_then(|(table, row, column)| op(&table, row, column))
        {
            Ok(edit) => {
                self.apply(&edit);
                Outcome::applied()
            }
            Err(reason) => reason.into(),
        }
    }

    fn run_sort(&mut self, result: std::result::Result<Option<Edit>, NotApplicable>) -> Outcome {
        match result {
            Ok(Some(edit)) => {
                self.apply(&edit);
                Outcome::applied()
            }
            Ok(None) => Outcome::skipped("Already sorted"),
            Err(reason) => reason.into(),
        }
    }

    pub fn align(&mut self) -> Outcome {
        self.run(|t, r, c| Ok(ops::align(t, r, c)))
    }

    pub fn insert_row(&mut self, direction: VerticalDirection) -> Outcome {
        self.run(|t, r, c| Ok(ops::insert_row(t, r, c, direction)))
    }

    pub fn insert_separator(&mut self) -> Outcome {
        self.run(|t, r, c| Ok(ops::insert_separator(t, r, c)))
    }

    pub fn delete_row(&mut self) -> Outcome {
        self.run(ops::delete_row)
    }

    pub fn move_row(&mut self, direction: VerticalDirection) -> Outcome {
        self.run(|t, r, c| ops::move_row(t, r, c, direction))
    }

    pub fn insert_column(&mut self, direction: HorizontalDirection) -> Outcome {
        self.run(|t, r, c| Ok(ops::insert_column(t, r, c, direction)))
    }

    pub fn delete_column(&mut self) -> Outcome {
        self.run(ops::delete_column)
    }

    pub fn move_column(&mut self, direction: HorizontalDirection) -> Outcome {
        self.run(|t, r, c| ops::move_column(t, r, c, direction))
    }

    pub fn next_field(&mut self) -> Outcome {
        self.run(|t, r, c| Ok(ops::next_field(t, r, c)))
    }

    pub fn previous_field(&mut self) -> Outcome {
        self.run(ops::previous_field)
    }

    /// Sort the table rows around the cursor by the cursor's column.
    pub fn sort_rows(&mut self, kind: RowSortKind, reverse: bool) -> Outcome {
        let result = self
            .table_at_cursor()
            .and_then(|(table, row, column)| ops::sort_rows(&table, row, column, kind, reverse));
        self.run_sort(result)
    }

    /// Sort outline entries at the cursor or in the selection.
    pub fn sort_entries(&mut self, key: SortKey, reverse: bool, property: Option<&str>) -> Outcome {
        let lines = self.buffer.lines();
        let request = EntrySort {
            key,
            reverse,
            property,
            todo_keywords: &self.config.todo_keywords,
            syntax: self.syntax,
        };
        let result = outline::sort_entries(
            &lines,
            self.buffer.cursor().line,
            self.buffer.selection(),
            &request,
        );
        self.run_sort(result)
    }

    /// Serialize the table under the cursor.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn export(&self, format: ExportFormat) -> Result<std::result::Result<String, NotApplicable>> {
        match self.table_at_cursor() {
            Ok((table, _, _)) => table::export(&table, format).map(Ok),
            Err(reason) => Ok(Err(reason)),
        }
    }

    /// Write the table under the cursor to `path`.
    ///
    /// # Errors
    /// Returns an error if serialization or the file write fails.
    pub fn export_to_file(&self, format: ExportFormat, path: &Path) -> Result<Outcome> {
        let text = match self.export(format)? {
            Ok(text) => text,
            Err(reason) => return Ok(reason.into()),
        };
        fs::write(path, text).map_err(|source| {
            warn!(path = %path.display(), %source, "table export failed");
            Error::File {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Outcome::applied_with(format!("Exported to {}", path.display())))
    }

    /// Copy the table under the cursor to the clipboard.
    ///
    /// # Errors
    /// Returns an error if serialization or the clipboard write fails.
    pub fn copy_table(&mut self, format: ExportFormat) -> Result<Outcome> {
        let text = match self.export(format)? {
            Ok(text) => text,
            Err(reason) => return Ok(reason.into()),
        };
        self.clipboard.write(&text)?;
        Ok(Outcome::applied_with("Copied table"))
    }

    /// Turn clipboard text into a table at the cursor line.
    ///
    /// A blank cursor line is replaced; otherwise the table goes above it.
    ///
    /// # Errors
    /// Returns an error if the clipboard cannot be read or its CSV is invalid.
    pub fn import_from_clipboard(&mut self) -> Result<Outcome> {
        let text = self.clipboard.read()?;
        let lines = table::import(&text, self.syntax)?;
        if lines.is_empty() {
            return Ok(NotApplicable::EmptyImport.into());
        }
        let line = self.buffer.cursor().line;
        let blank = self
            .buffer
            .line_at(line)
            .is_some_and(|l| l.trim().is_empty());
        let range = if blank { line..line + 1 } else { line..line };
        let edit = Edit {
            range,
            lines,
            cursor_line: line,
            cursor_column: ops::column_offset(&[], 0),
        };
        self.apply(&edit);
        Ok(Outcome::applied())
    }

    /// Data rows of the table named `name`.
    pub fn lookup_table(&self, name: &str) -> Option<Vec<Vec<String>>> {
        table::find_named(&self.buffer.lines(), name, self.syntax)
    }

    /// Truncation projections for every table in the document.
    pub fn projections(&self) -> Projection {
        let lines = self.buffer.lines();
        let mut projection = Projection::default();
        for table in Table::locate_all(&lines, self.syntax) {
            projection.extend(table::project(&table, &lines, &self.config.marker));
        }
        projection
    }

    /// Tell the session the document text changed at `now_ms`.
    pub const fn note_text_changed(&mut self, now_ms: u64) {
        self.debouncer.queue(now_ms);
    }

    /// Fresh projections once the document has been quiet long enough.
    pub fn take_projections(&mut self, now_ms: u64) -> Option<Projection> {
        self.debouncer
            .take_ready(now_ms)
            .then(|| self.projections())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("buffer", &self.buffer)
            .field("syntax", &self.syntax)
            .field("config", &self.config)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
