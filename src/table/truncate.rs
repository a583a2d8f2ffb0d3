//! Truncation projection for columns with a `<N>` max-width cookie.
//!
//! The stored text is never touched. Instead this computes which byte ranges
//! a renderer should hide and where it should draw a marker glyph, so a long
//! cell reads as `avery…` while the document still holds `averylongvalue`.
//! Every projected cell occupies exactly `N + 1` columns, or `W + 1` when the
//! column is already narrower than `N`: the extra column is reserved for the
//! marker so the layout does not jump as content changes.

use std::ops::Range;

use serde::Serialize;

use crate::table::{RowKind, Table, tokenizer};
use crate::width;

/// Bytes `start..end` of document line `line` should not be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HideRange {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Draw `glyph` before byte `offset` of document line `line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub line: usize,
    pub offset: usize,
    pub glyph: String,
}

/// Declarative result of projecting a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub hides: Vec<HideRange>,
    pub markers: Vec<Marker>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.hides.is_empty() && self.markers.is_empty()
    }

    /// Merge another projection into this one.
    pub fn extend(&mut self, other: Self) {
        self.hides.extend(other.hides);
        self.markers.extend(other.markers);
    }

    /// Apply the projection to one line, the way a renderer would show it.
    pub fn render_line(&self, line: usize, text: &str) -> String {
        let hidden = |idx: usize| {
            self.hides
                .iter()
                .any(|h| h.line == line && (h.start..h.end).contains(&idx))
        };
        let markers_at = |idx: usize| {
            self.markers
                .iter()
                .filter(move |m| m.line == line && m.offset == idx)
        };

        let mut out = String::with_capacity(text.len());
        for (idx, ch) in text.char_indices() {
            for marker in markers_at(idx) {
                out.push_str(&marker.glyph);
            }
            if !hidden(idx) {
                out.push(ch);
            }
        }
        for marker in markers_at(text.len()) {
            out.push_str(&marker.glyph);
        }
        out
    }
}

/// Byte spans between cell delimiters, excluding the delimiters.
fn cell_spans(line: &str, separator: bool) -> Vec<Range<usize>> {
    let delimiters: Vec<usize> = if separator {
        line.match_indices(['|', '+']).map(|(idx, _)| idx).collect()
    } else {
        tokenizer::pipe_offsets(line)
    };
    delimiters
        .windows(2)
        .map(|pair| pair[0] + 1..pair[1])
        .collect()
}

fn leading_space(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

fn trailing_space(text: &str) -> usize {
    text.len() - text.trim_end().len()
}

struct CellProjector<'a> {
    line: usize,
    text: &'a str,
    marker: &'a str,
    out: &'a mut Projection,
}

impl CellProjector<'_> {
    fn hide(&mut self, start: usize, end: usize) {
        if start < end {
            self.out.hides.push(HideRange {
                line: self.line,
                start,
                end,
            });
        }
    }

    /// Keep `columns` pad spaces after `from` and hide the rest of the cell.
    fn keep_pad(&mut self, from: usize, columns: usize, end: usize) {
        self.hide((from + columns).min(end), end);
    }

    fn blank(&mut self, span: Range<usize>, target: usize) {
        self.hide(span.start + target.min(span.len()), span.end);
    }

    fn data(&mut self, span: Range<usize>, target: usize) {
        let text = self.text;
        let cell = &text[span.clone()];
        let content = cell.trim();
        if content.is_empty() {
            self.blank(span, target);
            return;
        }
        let content_start = span.start + leading_space(cell);
        let content_end = span.end - trailing_space(cell);
        self.hide(span.start, content_start);

        let content_width = width::str_width(content);
        if content_width < target {
            self.keep_pad(content_end, target - content_width, span.end);
            return;
        }
        let marker_width = width::str_width(self.marker);
        let prefix = width::prefix_within(content, target.saturating_sub(marker_width));
        let cut = content_start + prefix;
        self.hide(cut, content_end);
        self.out.markers.push(Marker {
            line: self.line,
            offset: cut,
            glyph: self.marker.to_string(),
        });
        // a wide glyph straddling the limit leaves the cut a column short
        let shown = width::str_width(&content[..prefix]) + marker_width;
        self.keep_pad(content_end, target.saturating_sub(shown), span.end);
    }

    fn cookie(&mut self, span: Range<usize>, target: usize) {
        let text = self.text;
        let cell = &text[span.clone()];
        let cookie = cell.trim();
        if cookie.is_empty() {
            self.blank(span, target);
            return;
        }
        let leading = leading_space(cell);
        let trailing = trailing_space(cell);
        let cookie_start = span.start + leading;
        let cookie_width = width::str_width(cookie);
        if cookie_width >= target {
            self.hide(span.start, cookie_start);
            self.hide(cookie_start + width::prefix_within(cookie, target), span.end);
            return;
        }

        let padding = target - cookie_width;
        let right = trailing.min(padding - leading.min(padding / 2));
        let left = leading.min(padding - right);
        self.hide(span.start, cookie_start - left);
        self.hide(span.end - trailing + right, span.end);
    }

    fn separator(&mut self, span: Range<usize>, target: usize) {
        // keep the final character so a markdown `:` marker stays visible
        if span.len() > target {
            self.hide(span.start + target - 1, span.end - 1);
        }
    }
}

/// Project every max-width column of `table` over the document `lines`.
///
/// A column of width `W` with a `<N>` cookie shows `min(W, N) + 1` columns
/// in every row.
pub fn project(table: &Table, lines: &[String], marker: &str) -> Projection {
    let mut projection = Projection::default();
    let limited: Vec<(usize, usize)> = table
        .columns
        .iter()
        .enumerate()
        .filter_map(|(idx, spec)| {
            let max = spec.max_width?;
            let column_width = table.widths.get(idx).copied().unwrap_or(0);
            Some((idx, column_width.min(max) + 1))
        })
        .collect();
    if limited.is_empty() {
        return projection;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let line = table.start_line + row_idx;
        let Some(text) = lines.get(line) else {
            continue;
        };
        let spans = cell_spans(text, row.kind == RowKind::Separator);
        let mut projector = CellProjector {
            line,
            text,
            marker,
            out: &mut projection,
        };
        for &(column, target) in &limited {
            let Some(span) = spans.get(column).cloned() else {
                continue;
            };
            match row.kind {
                RowKind::Data => projector.data(span, target),
                RowKind::Spec => projector.cookie(span, target),
                RowKind::Separator => projector.separator(span, target),
            }
        }
    }
    projection
}
