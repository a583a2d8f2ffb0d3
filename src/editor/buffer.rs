use std::ops::Range;

use ropey::Rope;

/// Cursor position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
}

impl Cursor {
    /// Create a cursor at a specific position.
    pub const fn at(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// A line-indexed document backed by a rope.
///
/// Table and outline operations read it as a slice of lines and write back
/// through [`EditorBuffer::replace_lines`], one call per operation.
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    selection: Option<Range<usize>>,
    dirty: bool,
}

impl EditorBuffer {
    /// Create a new buffer from a string.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            selection: None,
            dirty: false,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// The current cursor position.
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Whether the buffer has been modified since creation or last save.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let s = self.rope.line(line_idx).to_string();
        Some(s.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    /// Every line of the buffer, without line terminators.
    pub fn lines(&self) -> Vec<String> {
        (0..self.line_count())
            .filter_map(|idx| self.line_at(idx))
            .collect()
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace lines `range` (end exclusive) with `lines` in one edit.
    ///
    /// An empty range inserts before `range.start`; a range starting at
    /// [`Self::line_count`] appends.
    pub fn replace_lines(&mut self, range: Range<usize>, lines: &[String]) {
        let total = self.line_count();
        let start = range.start.min(total);
        let end = range.end.clamp(start, total);
        let joined = lines.join("\n");

        let (from, to, insert) = if start == total {
            let at = self.rope.len_chars();
            (at, at, format!("\n{joined}"))
        } else if end < total {
            let insert = if lines.is_empty() {
                String::new()
            } else {
                format!("{joined}\n")
            };
            (self.rope.line_to_char(start), self.rope.line_to_char(end), insert)
        } else if lines.is_empty() && start > 0 {
            // drop the newline that ended the line before the removed tail
            (self.rope.line_to_char(start) - 1, self.rope.len_chars(), String::new())
        } else {
            (self.rope.line_to_char(start), self.rope.len_chars(), joined)
        };

        if to > from {
            self.rope.remove(from..to);
        }
        if !insert.is_empty() {
            self.rope.insert(from, &insert);
        }
        self.dirty = true;
        self.move_to(self.cursor.line, self.cursor.col);
    }

    /// Move cursor to a specific line and column, clamped to the buffer.
    pub fn move_to(&mut self, line: usize, col: usize) {
        let max_line = self.line_count().saturating_sub(1);
        let line = line.min(max_line);
        let text = self.line_at(line).unwrap_or_default();
        let mut col = col.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor = Cursor::at(line, col);
    }

    /// The selected line range, if any non-empty selection is active.
    pub fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone().filter(|r| !r.is_empty())
    }

    /// Select lines `range` (end exclusive).
    pub fn set_selection(&mut self, range: Range<usize>) {
        self.selection = Some(range);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("cursor", &self.cursor)
            .field("selection", &self.selection)
            .field("dirty", &self.dirty)
            .finish()
    }
}
