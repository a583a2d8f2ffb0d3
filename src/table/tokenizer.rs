//! Row tokenizing and formatting.
//!
//! Cells are split on raw pipes. Inline markup is tracked so that verbatim
//! spans keep their backslash escapes, but an unclosed span never swallows a
//! pipe: the markup stack resets at every cell boundary.

use crate::table::Syntax;
use crate::width::{self, Alignment};

/// Self-closing inline markup delimiters.
const MARKUP: &[char] = &['`', '~', '=', '*', '/', '_', '+'];

/// Delimiters whose content is taken literally.
const VERBATIM: &[char] = &['`', '~', '='];

/// Characters that may precede an opening delimiter (besides whitespace).
const PRE: &[char] = &['{', '(', '-', '\'', '"'];

/// Characters that may follow a closing delimiter (besides whitespace).
const POST: &[char] = &['-', '.', ',', ';', ':', '!', '?', '\'', ')', '}', '|'];

/// True if the trimmed line starts and ends with a pipe.
pub fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn strip_delimiters(line: &str) -> &str {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    inner.strip_suffix('|').unwrap_or(inner)
}

fn can_open(prev: Option<char>, next: Option<char>) -> bool {
    let pre_ok = prev.is_none_or(|c| c.is_whitespace() || PRE.contains(&c));
    let next_ok = next.is_some_and(|c| !c.is_whitespace());
    pre_ok && next_ok
}

fn can_close(prev: Option<char>, next: Option<char>) -> bool {
    let prev_ok = prev.is_some_and(|c| !c.is_whitespace());
    let post_ok = next.is_none_or(|c| c.is_whitespace() || POST.contains(&c));
    prev_ok && post_ok
}

/// Split a table line into trimmed cell values.
///
/// `\|` is a literal pipe. Outside verbatim markup it is unescaped; inside
/// `` ` ``, `~` or `=` spans the backslash is kept as written. `\\|` is an
/// escaped backslash followed by a cell boundary.
pub fn parse_row(line: &str) -> Vec<String> {
    let chars: Vec<char> = strip_delimiters(line).chars().collect();
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut stack: Vec<char> = Vec::new();
    let mut cell_start = 0;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let prev = if i == cell_start { None } else { Some(chars[i - 1]) };
        let in_verbatim = stack.iter().any(|c| VERBATIM.contains(c));

        if ch == '\\' {
            let run = chars[i..].iter().take_while(|c| **c == '\\').count();
            let after = i + run;
            if run % 2 == 1 && chars.get(after) == Some(&'|') {
                let kept = if in_verbatim { run } else { run - 1 };
                current.extend(std::iter::repeat_n('\\', kept));
                current.push('|');
                i = after + 1;
            } else {
                current.extend(std::iter::repeat_n('\\', run));
                i = after;
            }
            continue;
        }
        if ch == '|' {
            cells.push(current.trim().to_string());
            current.clear();
            stack.clear();
            i += 1;
            cell_start = i;
            continue;
        }
        if MARKUP.contains(&ch) {
            if let Some(pos) = stack.iter().rposition(|c| *c == ch) {
                if can_close(prev, next) {
                    stack.truncate(pos);
                }
            } else if !in_verbatim && can_open(prev, next) {
                stack.push(ch);
            }
        }
        current.push(ch);
        i += 1;
    }
    cells.push(current.trim().to_string());
    cells
}

/// Escape pipes that would otherwise read as cell boundaries.
pub fn escape_cell(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut backslashes = 0usize;
    for ch in cell.chars() {
        if ch == '|' && backslashes % 2 == 0 {
            out.push('\\');
        }
        backslashes = if ch == '\\' { backslashes + 1 } else { 0 };
        out.push(ch);
    }
    out
}

/// Byte offsets of the pipes in `line` that delimit cells.
///
/// A pipe is escaped when an odd run of backslashes precedes it.
pub fn pipe_offsets(line: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut backslashes = 0usize;
    for (idx, ch) in line.char_indices() {
        if ch == '\\' {
            backslashes += 1;
            continue;
        }
        if ch == '|' && backslashes % 2 == 0 {
            offsets.push(idx);
        }
        backslashes = 0;
    }
    offsets
}

/// Display width of a cell as it is stored in the text.
pub fn cell_width(cell: &str) -> usize {
    width::str_width(&escape_cell(cell))
}

/// Format cells into `| a | b |`, padding each to its column width.
pub fn format_row(cells: &[String], widths: &[usize], alignments: &[Alignment]) -> String {
    let mut out = String::from("|");
    for (idx, width) in widths.iter().enumerate() {
        let content = cells.get(idx).map_or_else(String::new, |c| escape_cell(c));
        let alignment = alignments.get(idx).copied().unwrap_or_default();
        out.push(' ');
        out.push_str(&width::align(&content, *width, alignment));
        out.push_str(" |");
    }
    out
}

/// Format a row of cookies, each centered in its column.
pub fn format_spec_row(cookies: &[String], widths: &[usize]) -> String {
    let mut out = String::from("|");
    for (idx, width) in widths.iter().enumerate() {
        let cookie = cookies.get(idx).map_or("", String::as_str);
        out.push(' ');
        out.push_str(&width::center(cookie, *width));
        out.push_str(" |");
    }
    out
}

/// Segments of a separator line, split on `|` and `+`.
pub fn separator_segments(line: &str) -> Vec<String> {
    strip_delimiters(line)
        .split(['|', '+'])
        .map(|s| s.trim().to_string())
        .collect()
}

/// Format a separator line. Markdown runs keep the `:` markers found in
/// `template` at the same column.
pub fn format_separator(widths: &[usize], syntax: Syntax, template: &[String]) -> String {
    let runs: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let mut dashes = "-".repeat(width + 2);
            if syntax == Syntax::Markdown {
                let marker = template.get(idx).map_or("", String::as_str);
                if marker.starts_with(':') {
                    dashes.replace_range(..1, ":");
                }
                if marker.len() > 1 && marker.ends_with(':') {
                    dashes.replace_range(dashes.len() - 1.., ":");
                }
            }
            dashes
        })
        .collect();
    let joiner = match syntax {
        Syntax::Org => "+",
        Syntax::Markdown => "|",
    };
    format!("|{}|", runs.join(joiner))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_simple_row() {
        assert_eq!(parse_row("| a | b |"), cells(&["a", "b"]));
    }

    #[test]
    fn test_parse_escaped_pipe_is_literal() {
        assert_eq!(parse_row("| a \\| b | c |"), cells(&["a | b", "c"]));
    }

    #[test]
    fn test_unclosed_markup_does_not_swallow_pipe() {
        assert_eq!(parse_row("| *unclosed | x |"), cells(&["*unclosed", "x"]));
    }

    #[test]
    fn test_raw_pipe_splits_inside_closed_markup() {
        assert_eq!(parse_row("| *a | b* | c |"), cells(&["*a", "b*", "c"]));
    }

    #[test]
    fn test_verbatim_keeps_escape() {
        assert_eq!(parse_row("| =a\\|b= | c |"), cells(&["=a\\|b=", "c"]));
        assert_eq!(parse_row("| ~x \\| y~ |"), cells(&["~x \\| y~"]));
    }

    #[test]
    fn test_closed_verbatim_unescapes_after_span() {
        assert_eq!(parse_row("| =v= a\\|b |"), cells(&["=v= a|b"]));
    }

    #[test]
    fn test_slash_inside_word_does_not_open_markup() {
        // `a/b` never opens italics, so `=` later still opens verbatim
        assert_eq!(parse_row("| a/b =x\\|y= |"), cells(&["a/b =x\\|y="]));
    }

    #[test]
    fn test_parse_indented_and_empty_cells() {
        assert_eq!(parse_row("   |  | x |"), cells(&["", "x"]));
    }

    #[test]
    fn test_is_table_line() {
        assert!(is_table_line("| a |"));
        assert!(is_table_line("  |---+---|  "));
        assert!(!is_table_line("| a"));
        assert!(!is_table_line("text | a |"));
    }

    #[test]
    fn test_escape_cell_is_idempotent() {
        assert_eq!(escape_cell("a | b"), "a \\| b");
        assert_eq!(escape_cell("a \\| b"), "a \\| b");
    }

    #[test]
    fn test_escaped_backslash_before_pipe_splits() {
        assert_eq!(parse_row("| a\\\\|b | c |"), cells(&["a\\\\", "b", "c"]));
        assert_eq!(parse_row("| a\\\\\\|b |"), cells(&["a\\\\|b"]));
        assert_eq!(escape_cell("a\\\\"), "a\\\\");
        assert_eq!(escape_cell("a\\\\|b"), "a\\\\\\|b");
    }

    #[test]
    fn test_pipe_offsets_respect_backslash_parity() {
        assert_eq!(pipe_offsets("| a\\| b |"), vec![0, 8]);
        assert_eq!(pipe_offsets("| a\\\\| b |"), vec![0, 5, 9]);
    }

    #[test]
    fn test_format_row_pads_and_aligns() {
        let row = format_row(
            &cells(&["a", "b", "c"]),
            &[3, 3, 3],
            &[Alignment::Left, Alignment::Right, Alignment::Center],
        );
        assert_eq!(row, "| a   |   b |  c  |");
    }

    #[test]
    fn test_format_row_fills_missing_cells() {
        let row = format_row(&cells(&["x"]), &[1, 2], &[]);
        assert_eq!(row, "| x |    |");
    }

    #[test]
    fn test_format_row_escapes_pipes() {
        let row = format_row(&cells(&["a | b"]), &[6], &[]);
        assert_eq!(row, "| a \\| b |");
    }

    #[test]
    fn test_format_row_wide_glyphs() {
        let row = format_row(&cells(&["中", "ab"]), &[2, 2], &[]);
        assert_eq!(row, "| 中 | ab |");
    }

    #[test]
    fn test_format_separator_org_and_markdown() {
        assert_eq!(format_separator(&[1, 3], Syntax::Org, &[]), "|---+-----|");
        assert_eq!(
            format_separator(&[1, 3], Syntax::Markdown, &[]),
            "|---|-----|"
        );
    }

    #[test]
    fn test_markdown_separator_keeps_colons() {
        let template = cells(&[":--", "--:", ":-:"]);
        assert_eq!(
            format_separator(&[3, 3, 3], Syntax::Markdown, &template),
            "|:----|----:|:---:|"
        );
    }

    #[test]
    fn test_separator_segments_split_on_plus() {
        assert_eq!(separator_segments("|---+:--|"), cells(&["---", ":--"]));
    }

    #[test]
    fn test_format_spec_row_centers() {
        assert_eq!(
            format_spec_row(&cells(&["<l>", "<5>"]), &[5, 7]),
            "|  <l>  |   <5>   |"
        );
    }
}
