//! Table detection and column layout.
//!
//! A [`Table`] is a snapshot built from document lines on every call. It is
//! never cached: callers locate, edit, and throw it away.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

use crate::table::{Syntax, cookie, tokenizer};
use crate::width::Alignment;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#\+(?:tbl)?name:\s*(.*?)\s*$").expect("valid name regex")
});

static SEPARATOR_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-:]+$").expect("valid separator regex"));

/// What a table row is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Data,
    Separator,
    Spec,
}

/// One table line.
///
/// Data rows hold parsed cell values. Separator rows hold their dash
/// segments and spec rows their raw cookie cells; neither counts toward
/// column widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub kind: RowKind,
    pub cells: Vec<String>,
}

impl Row {
    /// A data row with the given cells.
    pub const fn data(cells: Vec<String>) -> Self {
        Self {
            kind: RowKind::Data,
            cells,
        }
    }

    /// An empty data row with `columns` cells.
    pub fn blank(columns: usize) -> Self {
        Self::data(vec![String::new(); columns])
    }

    /// A plain separator row.
    pub const fn separator() -> Self {
        Self {
            kind: RowKind::Separator,
            cells: Vec::new(),
        }
    }

    /// Classify and parse a single table line.
    pub fn parse(line: &str) -> Self {
        let cells = tokenizer::parse_row(line);
        let is_separator = cells.iter().all(|c| c.is_empty() || is_dash_run(c))
            && cells.iter().any(|c| !c.is_empty());
        if is_separator {
            return Self {
                kind: RowKind::Separator,
                cells: tokenizer::separator_segments(line),
            };
        }

        let is_spec = cells.iter().all(|c| c.is_empty() || cookie::is_cookie(c))
            && cells.iter().any(|c| !c.is_empty());
        let kind = if is_spec { RowKind::Spec } else { RowKind::Data };
        Self { kind, cells }
    }

    pub fn is_data(&self) -> bool {
        self.kind == RowKind::Data
    }

    /// Cells that take part in width computation.
    pub fn data_cells(&self) -> &[String] {
        if self.is_data() { &self.cells } else { &[] }
    }
}

/// A separator cell: dash/colon runs, joined by `+` in org tables.
fn is_dash_run(cell: &str) -> bool {
    cell.split('+').all(|s| SEPARATOR_SEGMENT_RE.is_match(s))
}

/// Layout settings for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColumnSpec {
    pub alignment: Alignment,
    pub min_width: Option<usize>,
    pub max_width: Option<usize>,
}

/// A contiguous run of pipe rows in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// First document line of the table.
    pub start_line: usize,
    /// Last document line of the table (inclusive).
    pub end_line: usize,
    /// Leading whitespace of the first row, reused for every formatted row.
    pub indent: String,
    pub syntax: Syntax,
    pub rows: Vec<Row>,
    /// Row indices of separator rows.
    pub separator_rows: BTreeSet<usize>,
    /// Row index of the first spec row.
    pub spec_row: Option<usize>,
    pub columns: Vec<ColumnSpec>,
    /// Formatted display width of each column.
    pub widths: Vec<usize>,
}

impl Table {
    /// Find the table containing `at_line`, if that line is a table row.
    pub fn locate(lines: &[String], at_line: usize, syntax: Syntax) -> Option<Self> {
        if !lines.get(at_line).is_some_and(|l| tokenizer::is_table_line(l)) {
            return None;
        }
        let mut start = at_line;
        while start > 0 && tokenizer::is_table_line(&lines[start - 1]) {
            start -= 1;
        }
        let mut end = at_line;
        while end + 1 < lines.len() && tokenizer::is_table_line(&lines[end + 1]) {
            end += 1;
        }

        let indent: String = lines[start]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        let rows = lines[start..=end].iter().map(|l| Row::parse(l)).collect();
        let table = Self::from_rows(rows, start, indent, syntax);
        trace!(
            start = table.start_line,
            end = table.end_line,
            columns = table.column_count(),
            "located table"
        );
        Some(table)
    }

    /// Every table in the document, top to bottom.
    pub fn locate_all(lines: &[String], syntax: Syntax) -> Vec<Self> {
        let mut tables = Vec::new();
        let mut line = 0;
        while line < lines.len() {
            if let Some(table) = Self::locate(lines, line, syntax) {
                line = table.end_line + 1;
                tables.push(table);
            } else {
                line += 1;
            }
        }
        tables
    }

    /// Build a table from rows, padding ragged rows and computing layout.
    pub fn from_rows(mut rows: Vec<Row>, start_line: usize, indent: String, syntax: Syntax) -> Self {
        let column_count = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        for row in &mut rows {
            if row.cells.len() < column_count {
                row.cells.resize(column_count, String::new());
            }
        }

        let separator_rows: BTreeSet<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == RowKind::Separator)
            .map(|(idx, _)| idx)
            .collect();
        let spec_row = rows.iter().position(|r| r.kind == RowKind::Spec);

        let columns = column_specs(&rows, spec_row, separator_rows.first().copied(), syntax, column_count);
        let widths = column_widths(&rows, &columns);

        Self {
            start_line,
            end_line: start_line + rows.len().saturating_sub(1),
            indent,
            syntax,
            rows,
            separator_rows,
            spec_row,
            columns,
            widths,
        }
    }

    /// Same table with different rows, relaid out from scratch.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self::from_rows(rows, self.start_line, self.indent.clone(), self.syntax)
    }

    pub fn column_count(&self) -> usize {
        self.widths.len()
    }

    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }

    /// Row index for a document line inside the table.
    pub fn row_at_line(&self, line: usize) -> Option<usize> {
        (self.start_line..=self.end_line)
            .contains(&line)
            .then(|| line - self.start_line)
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_data()).count()
    }

    /// Column alignments in order.
    pub fn alignments(&self) -> Vec<Alignment> {
        self.columns.iter().map(|c| c.alignment).collect()
    }

    /// Index of the cell containing byte offset `col` of the row's line.
    pub fn column_at(&self, line_text: &str, col: usize) -> usize {
        let col = col.min(line_text.len());
        let before = line_text.get(..col).unwrap_or(line_text);
        tokenizer::pipe_offsets(before.trim_start())
            .len()
            .saturating_sub(1)
            .min(self.column_count().saturating_sub(1))
    }

    /// Format one row with the table's current layout.
    pub fn format_row(&self, row: &Row) -> String {
        let body = match row.kind {
            RowKind::Data => tokenizer::format_row(&row.cells, &self.widths, &self.alignments()),
            RowKind::Separator => tokenizer::format_separator(&self.widths, self.syntax, &row.cells),
            RowKind::Spec => {
                let cookies: Vec<String> = row.cells.iter().map(|c| cookie::format(c)).collect();
                tokenizer::format_spec_row(&cookies, &self.widths)
            }
        };
        format!("{}{body}", self.indent)
    }

    /// The whole table as aligned text lines.
    pub fn format_lines(&self) -> Vec<String> {
        self.rows.iter().map(|row| self.format_row(row)).collect()
    }

    /// Data rows as a rectangular grid of cell values.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .filter(|r| r.is_data())
            .map(|r| r.cells.clone())
            .collect()
    }
}

fn column_specs(
    rows: &[Row],
    spec_row: Option<usize>,
    first_separator: Option<usize>,
    syntax: Syntax,
    column_count: usize,
) -> Vec<ColumnSpec> {
    let mut columns = vec![ColumnSpec::default(); column_count];
    if let Some(spec) = spec_row.map(|idx| &rows[idx]) {
        for (column, cell) in columns.iter_mut().zip(&spec.cells) {
            if let Some(parsed) = cookie::parse(cell) {
                column.alignment = parsed.alignment;
                column.min_width = parsed.min_width;
                column.max_width = parsed.max_width;
            }
        }
    } else if syntax == Syntax::Markdown {
        if let Some(separator) = first_separator.map(|idx| &rows[idx]) {
            for (column, segment) in columns.iter_mut().zip(&separator.cells) {
                column.alignment = match (segment.starts_with(':'), segment.len() > 1 && segment.ends_with(':')) {
                    (true, true) => Alignment::Center,
                    (false, true) => Alignment::Right,
                    _ => Alignment::Left,
                };
            }
        }
    }
    columns
}

fn column_widths(rows: &[Row], columns: &[ColumnSpec]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let content = rows
                .iter()
                .filter_map(|r| r.data_cells().get(idx))
                .map(|c| tokenizer::cell_width(c))
                .max()
                .unwrap_or(0);
            content.max(spec.min_width.unwrap_or(0))
        })
        .collect()
}

/// Look up a table by `#+NAME:` and return its data rows.
pub fn find_named(lines: &[String], name: &str, syntax: Syntax) -> Option<Vec<Vec<String>>> {
    let wanted = name.trim();
    Table::locate_all(lines, syntax)
        .into_iter()
        .find(|table| {
            table
                .start_line
                .checked_sub(1)
                .and_then(|idx| NAME_RE.captures(&lines[idx]))
                .and_then(|caps| caps.get(1))
                .is_some_and(|m| m.as_str() == wanted)
        })
        .map(|table| table.to_grid())
}
