//! Structural table edits.
//!
//! Every operation takes a located [`Table`] plus the cursor's row and
//! column and returns one [`Edit`] that replaces the whole table region.
//! Nothing is patched cell by cell.

use std::ops::Range;

use tracing::debug;

use crate::sort::{self, SortValue};
use crate::table::{Row, Table};
use crate::width;

/// Why an operation did not apply. These are expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotApplicable {
    #[error("Not in a table")]
    NoTable,
    #[error("Not on a table data row")]
    NotDataRow,
    #[error("Cannot delete the last row")]
    LastRow,
    #[error("Cannot delete the last column")]
    LastColumn,
    #[error("Cannot move row further")]
    RowEdge,
    #[error("Cannot move column further")]
    ColumnEdge,
    #[error("Cannot move to previous table field")]
    TableStart,
    #[error("Fewer than two entries to sort")]
    TooFewEntries,
    #[error("Nothing to sort at point")]
    NoSortScope,
    #[error("No property name given")]
    NoProperty,
    #[error("Nothing to import")]
    EmptyImport,
}

/// A single atomic replacement of document lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Document lines being replaced (end exclusive).
    pub range: Range<usize>,
    /// Replacement lines.
    pub lines: Vec<String>,
    /// Document line the cursor lands on afterwards.
    pub cursor_line: usize,
    /// Display column the cursor lands on afterwards.
    pub cursor_column: usize,
}

impl Edit {
    /// Byte offset of the cursor within its replacement line.
    pub fn cursor_byte(&self) -> usize {
        self.cursor_line
            .checked_sub(self.range.start)
            .and_then(|idx| self.lines.get(idx))
            .map_or(self.cursor_column, |line| {
                width::byte_at_column(line, self.cursor_column)
            })
    }
}

/// Which way a row moves or where a new row goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum VerticalDirection {
    Up,
    Down,
}

/// Which way a column moves or where a new column goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HorizontalDirection {
    Left,
    Right,
}

/// Key used when sorting table rows by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RowSortKind {
    /// Case-folded text.
    Alpha,
    /// Leading number of the cell.
    Numeric,
    /// First timestamp in the cell.
    Time,
}

impl RowSortKind {
    /// Decode an org-style key letter. Upper case means reverse.
    pub fn from_key(key: char) -> Option<(Self, bool)> {
        let kind = match key.to_ascii_lowercase() {
            'a' => Self::Alpha,
            'n' => Self::Numeric,
            't' => Self::Time,
            _ => return None,
        };
        Some((kind, key.is_ascii_uppercase()))
    }

    fn key(self, cell: &str) -> Option<SortValue> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match self {
            Self::Alpha => Some(SortValue::Text(cell.to_string())),
            Self::Numeric => sort::leading_number(cell).map(SortValue::Number),
            Self::Time => sort::first_timestamp(cell).map(SortValue::Date),
        }
    }
}

/// Display column where the content of `column` starts in a formatted row.
pub fn column_offset(widths: &[usize], column: usize) -> usize {
    2 + widths.iter().take(column).map(|w| w + 3).sum::<usize>()
}

fn replace(old: &Table, new: &Table, row: usize, column: usize) -> Edit {
    let row = row.min(new.rows.len().saturating_sub(1));
    let column = column.min(new.column_count().saturating_sub(1));
    Edit {
        range: old.start_line..old.end_line + 1,
        lines: new.format_lines(),
        cursor_line: new.start_line + row,
        cursor_column: width::str_width(&new.indent) + column_offset(&new.widths, column),
    }
}

/// Reformat the table in place.
pub fn align(table: &Table, row: usize, column: usize) -> Edit {
    replace(table, table, row, column)
}

/// Insert an empty row above or below `row`.
pub fn insert_row(table: &Table, row: usize, column: usize, direction: VerticalDirection) -> Edit {
    let at = match direction {
        VerticalDirection::Up => row,
        VerticalDirection::Down => row + 1,
    }
    .min(table.rows.len());
    let mut rows = table.rows.clone();
    rows.insert(at, Row::blank(table.column_count()));
    debug!(row = at, "insert table row");
    replace(table, &table.with_rows(rows), at, column)
}

/// Insert a separator row below `row`.
pub fn insert_separator(table: &Table, row: usize, column: usize) -> Edit {
    let mut rows = table.rows.clone();
    rows.insert((row + 1).min(rows.len()), Row::separator());
    replace(table, &table.with_rows(rows), row, column)
}

/// Delete `row`. The last data row of a table is never deleted.
pub fn delete_row(table: &Table, row: usize, column: usize) -> Result<Edit, NotApplicable> {
    let target = table.rows.get(row).ok_or(NotApplicable::NotDataRow)?;
    if table.rows.len() <= 1 || (target.is_data() && table.data_row_count() <= 1) {
        return Err(NotApplicable::LastRow);
    }
    let mut rows = table.rows.clone();
    rows.remove(row);
    debug!(row, "delete table row");
    Ok(replace(table, &table.with_rows(rows), row, column))
}

/// Swap `row` with its neighbour.
pub fn move_row(
    table: &Table,
    row: usize,
    column: usize,
    direction: VerticalDirection,
) -> Result<Edit, NotApplicable> {
    let target = match direction {
        VerticalDirection::Up => row.checked_sub(1),
        VerticalDirection::Down => Some(row + 1).filter(|t| *t < table.rows.len()),
    }
    .ok_or(NotApplicable::RowEdge)?;
    if row >= table.rows.len() {
        return Err(NotApplicable::RowEdge);
    }
    let mut rows = table.rows.clone();
    rows.swap(row, target);
    Ok(replace(table, &table.with_rows(rows), target, column))
}

/// Insert an empty column left or right of `column`.
pub fn insert_column(
    table: &Table,
    row: usize,
    column: usize,
    direction: HorizontalDirection,
) -> Edit {
    let at = match direction {
        HorizontalDirection::Left => column,
        HorizontalDirection::Right => column + 1,
    }
    .min(table.column_count());
    let rows = table
        .rows
        .iter()
        .cloned()
        .map(|mut r| {
            r.cells.insert(at.min(r.cells.len()), String::new());
            r
        })
        .collect();
    debug!(column = at, "insert table column");
    replace(table, &table.with_rows(rows), row, at)
}

/// Delete `column`. The last column of a table is never deleted.
pub fn delete_column(table: &Table, row: usize, column: usize) -> Result<Edit, NotApplicable> {
    if table.column_count() <= 1 {
        return Err(NotApplicable::LastColumn);
    }
    let rows = table
        .rows
        .iter()
        .cloned()
        .map(|mut r| {
            if column < r.cells.len() {
                r.cells.remove(column);
            }
            r
        })
        .collect();
    debug!(column, "delete table column");
    Ok(replace(table, &table.with_rows(rows), row, column))
}

/// Swap `column` with its neighbour. Widths are recomputed afterwards.
pub fn move_column(
    table: &Table,
    row: usize,
    column: usize,
    direction: HorizontalDirection,
) -> Result<Edit, NotApplicable> {
    let target = match direction {
        HorizontalDirection::Left => column.checked_sub(1),
        HorizontalDirection::Right => Some(column + 1).filter(|t| *t < table.column_count()),
    }
    .ok_or(NotApplicable::ColumnEdge)?;
    if column >= table.column_count() {
        return Err(NotApplicable::ColumnEdge);
    }
    let rows = table
        .rows
        .iter()
        .cloned()
        .map(|mut r| {
            r.cells.swap(column, target);
            r
        })
        .collect();
    Ok(replace(table, &table.with_rows(rows), row, target))
}

/// Align and move to the next cell, appending a row past the last one.
pub fn next_field(table: &Table, row: usize, column: usize) -> Edit {
    if column + 1 < table.column_count() && table.rows.get(row).is_some_and(Row::is_data) {
        return replace(table, table, row, column + 1);
    }
    let next_data = (row + 1..table.rows.len()).find(|idx| table.rows[*idx].is_data());
    if let Some(next) = next_data {
        return replace(table, table, next, 0);
    }
    let mut rows = table.rows.clone();
    rows.push(Row::blank(table.column_count()));
    let new = table.with_rows(rows);
    let last = new.rows.len() - 1;
    replace(table, &new, last, 0)
}

/// Align and move to the previous cell.
pub fn previous_field(table: &Table, row: usize, column: usize) -> Result<Edit, NotApplicable> {
    if column > 0 && table.rows.get(row).is_some_and(Row::is_data) {
        return Ok(replace(table, table, row, column - 1));
    }
    let previous = (0..row.min(table.rows.len()))
        .rev()
        .find(|idx| table.rows[*idx].is_data())
        .ok_or(NotApplicable::TableStart)?;
    Ok(replace(
        table,
        table,
        previous,
        table.column_count().saturating_sub(1),
    ))
}

/// Data rows around `row` that are not interrupted by marker rows.
fn data_block(table: &Table, row: usize) -> Option<Range<usize>> {
    if !table.rows.get(row)?.is_data() {
        return None;
    }
    let mut start = row;
    while start > 0 && table.rows[start - 1].is_data() {
        start -= 1;
    }
    let mut end = row + 1;
    while end < table.rows.len() && table.rows[end].is_data() {
        end += 1;
    }
    Some(start..end)
}

/// Sort the block of data rows around `row` by `column`.
///
/// Returns `Ok(None)` when the block is already in order, in which case
/// no edit must be applied.
pub fn sort_rows(
    table: &Table,
    row: usize,
    column: usize,
    kind: RowSortKind,
    reverse: bool,
) -> Result<Option<Edit>, NotApplicable> {
    let block = data_block(table, row).ok_or(NotApplicable::NotDataRow)?;
    if block.len() < 2 {
        return Err(NotApplicable::TooFewEntries);
    }
    let keys: Vec<Option<SortValue>> = table.rows[block.clone()]
        .iter()
        .map(|r| r.cells.get(column).and_then(|cell| kind.key(cell)))
        .collect();
    let order = sort::sorted_order(&keys, reverse);
    if sort::is_identity(&order) {
        debug!(?kind, column, "table rows already sorted");
        return Ok(None);
    }

    let mut rows = table.rows.clone();
    for (slot, source) in block.clone().zip(order) {
        rows[slot] = table.rows[block.start + source].clone();
    }
    debug!(?kind, column, reverse, rows = block.len(), "sorted table rows");
    Ok(Some(replace(table, &table.with_rows(rows), row, column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Syntax;

    fn table(text: &str) -> Table {
        let lines: Vec<String> = text.lines().map(ToString::to_string).collect();
        Table::locate(&lines, 0, Syntax::Org).unwrap()
    }

    #[test]
    fn test_column_offset() {
        assert_eq!(column_offset(&[3, 5], 0), 2);
        assert_eq!(column_offset(&[3, 5], 1), 8);
        assert_eq!(column_offset(&[3, 5], 2), 16);
    }

    #[test]
    fn test_align_places_cursor_at_cell_start() {
        let t = table("|a|bb|\n|ccc|d|");
        let edit = align(&t, 1, 1);
        assert_eq!(edit.lines, vec!["| a   | bb |", "| ccc | d  |"]);
        assert_eq!(edit.range, 0..2);
        assert_eq!(edit.cursor_line, 1);
        assert_eq!(edit.cursor_column, 8);
        assert_eq!(&edit.lines[1][edit.cursor_byte()..], "d  |");
    }

    #[test]
    fn test_align_with_oversized_cookie_keeps_content_width() {
        let t = table("| <l99999999999999> |\n| a |");
        assert_eq!(t.widths, vec![1]);
        let edit = align(&t, 1, 0);
        assert_eq!(edit.lines[1], "| a |");
    }

    #[test]
    fn test_insert_row_below_and_above() {
        let t = table("| a | b |");
        let below = insert_row(&t, 0, 1, VerticalDirection::Down);
        assert_eq!(below.lines, vec!["| a | b |", "|   |   |"]);
        assert_eq!(below.cursor_line, 1);

        let above = insert_row(&t, 0, 0, VerticalDirection::Up);
        assert_eq!(above.lines, vec!["|   |   |", "| a | b |"]);
        assert_eq!(above.cursor_line, 0);
    }

    #[test]
    fn test_insert_separator() {
        let t = table("| a | b |\n| c | d |");
        let edit = insert_separator(&t, 0, 0);
        assert_eq!(edit.lines, vec!["| a | b |", "|---+---|", "| c | d |"]);
    }

    #[test]
    fn test_delete_last_data_row_is_not_applicable() {
        let t = table("| only | row |");
        assert_eq!(delete_row(&t, 0, 0), Err(NotApplicable::LastRow));

        let with_header = table("| h |\n|---|\n| x |");
        assert_eq!(delete_row(&with_header, 0, 0).unwrap().lines, vec!["|---|", "| x |"]);
        let remaining = table("|---|\n| x |");
        assert_eq!(delete_row(&remaining, 1, 0), Err(NotApplicable::LastRow));
    }

    #[test]
    fn test_delete_row_shrinks_widths() {
        let t = table("| wide value |\n| x |");
        let edit = delete_row(&t, 0, 0).unwrap();
        assert_eq!(edit.range, 0..2);
        assert_eq!(edit.lines, vec!["| x |"]);
        assert_eq!(edit.cursor_line, 0);
    }

    #[test]
    fn test_move_row_swaps_and_follows() {
        let t = table("| a |\n| b |\n| c |");
        let edit = move_row(&t, 0, 0, VerticalDirection::Down).unwrap();
        assert_eq!(edit.lines, vec!["| b |", "| a |", "| c |"]);
        assert_eq!(edit.cursor_line, 1);
        assert_eq!(move_row(&t, 0, 0, VerticalDirection::Up), Err(NotApplicable::RowEdge));
        assert_eq!(move_row(&t, 2, 0, VerticalDirection::Down), Err(NotApplicable::RowEdge));
    }

    #[test]
    fn test_insert_and_delete_column() {
        let t = table("| a | b |\n|---+---|");
        let inserted = insert_column(&t, 0, 0, HorizontalDirection::Right);
        assert_eq!(inserted.lines, vec!["| a |  | b |", "|---+--+---|"]);
        assert_eq!(inserted.cursor_column, column_offset(&[1, 0, 1], 1));

        let deleted = delete_column(&t, 0, 0).unwrap();
        assert_eq!(deleted.lines, vec!["| b |", "|---|"]);
        let single = table("| a |");
        assert_eq!(delete_column(&single, 0, 0), Err(NotApplicable::LastColumn));
    }

    #[test]
    fn test_move_column_recomputes_widths_and_cursor() {
        let t = table("| a | long |\n| bb | c |");
        let edit = move_column(&t, 1, 0, HorizontalDirection::Right).unwrap();
        assert_eq!(edit.lines, vec!["| long | a  |", "| c    | bb |"]);
        assert_eq!(edit.cursor_column, column_offset(&[4, 2], 1));
        assert_eq!(
            move_column(&t, 0, 1, HorizontalDirection::Right),
            Err(NotApplicable::ColumnEdge)
        );
    }

    #[test]
    fn test_move_column_carries_spec_cookies() {
        let t = table("| <r> | <l> |\n| 10000 | xyz |");
        let edit = move_column(&t, 1, 0, HorizontalDirection::Right).unwrap();
        assert_eq!(edit.lines, vec!["| <l> |  <r>  |", "| xyz | 10000 |"]);
    }

    #[test]
    fn test_next_field_moves_and_appends_row() {
        let t = table("| a | b |\n|---+---|\n| c | d |");
        let edit = next_field(&t, 0, 0);
        assert_eq!(edit.cursor_line, 0);
        assert_eq!(edit.cursor_column, 6);

        let wrap = next_field(&t, 0, 1);
        assert_eq!(wrap.cursor_line, 2);
        assert_eq!(wrap.cursor_column, 2);

        let append = next_field(&t, 2, 1);
        assert_eq!(append.lines.len(), 4);
        assert_eq!(append.lines[3], "|   |   |");
        assert_eq!(append.cursor_line, 3);
    }

    #[test]
    fn test_previous_field() {
        let t = table("| a | b |\n|---+---|\n| c | d |");
        let edit = previous_field(&t, 2, 0).unwrap();
        assert_eq!(edit.cursor_line, 0);
        assert_eq!(edit.cursor_column, 6);
        assert_eq!(previous_field(&t, 0, 0), Err(NotApplicable::TableStart));
    }

    #[test]
    fn test_sort_rows_alphabetically() {
        let t = table("| b | 2 |\n| a | 1 |");
        let edit = sort_rows(&t, 0, 0, RowSortKind::Alpha, false).unwrap().unwrap();
        assert_eq!(edit.lines, vec!["| a | 1 |", "| b | 2 |"]);
    }

    #[test]
    fn test_sort_rows_already_sorted_is_noop() {
        let t = table("| a | 1 |\n| b | 2 |");
        assert_eq!(sort_rows(&t, 0, 0, RowSortKind::Alpha, false), Ok(None));
    }

    #[test]
    fn test_sort_rows_stays_inside_separator_block() {
        let t = table("| name | n |\n|------+---|\n| x | 10 |\n| y | 9 |\n| z |  |");
        let edit = sort_rows(&t, 3, 1, RowSortKind::Numeric, false).unwrap().unwrap();
        assert_eq!(
            edit.lines,
            vec![
                "| name | n  |",
                "|------+----|",
                "| y    | 9  |",
                "| x    | 10 |",
                "| z    |    |",
            ]
        );
    }

    #[test]
    fn test_sort_rows_reverse_keeps_empty_last() {
        let t = table("| 1 |\n|  |\n| 3 |");
        let edit = sort_rows(&t, 0, 0, RowSortKind::Numeric, true).unwrap().unwrap();
        assert_eq!(edit.lines, vec!["| 3 |", "| 1 |", "|   |"]);
    }

    #[test]
    fn test_sort_rows_by_time() {
        let t = table("| <2024-03-01> |\n| <2023-12-31> |");
        let edit = sort_rows(&t, 0, 0, RowSortKind::Time, false).unwrap().unwrap();
        assert_eq!(edit.lines[0], "| <2023-12-31> |");
    }

    #[test]
    fn test_sort_rows_requires_two_rows() {
        let t = table("| a |\n|---|\n| b |");
        assert_eq!(
            sort_rows(&t, 0, 0, RowSortKind::Alpha, false),
            Err(NotApplicable::TooFewEntries)
        );
        assert_eq!(
            sort_rows(&t, 1, 0, RowSortKind::Alpha, false),
            Err(NotApplicable::NotDataRow)
        );
    }

    #[test]
    fn test_row_sort_kind_from_key() {
        assert_eq!(RowSortKind::from_key('a'), Some((RowSortKind::Alpha, false)));
        assert_eq!(RowSortKind::from_key('N'), Some((RowSortKind::Numeric, true)));
        assert_eq!(RowSortKind::from_key('x'), None);
    }
}
