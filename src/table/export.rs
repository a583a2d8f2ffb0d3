//! Export to CSV/TSV/HTML/LaTeX and import from pasted text.
//!
//! Only data rows are exported: separators and cookie rows are layout, not
//! content.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{Row, Syntax, Table};

static SPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space-run regex"));

/// Serialization target for a table.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Tsv,
    Html,
    Latex,
}

impl ExportFormat {
    /// Conventional file extension for the format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Html => "html",
            Self::Latex => "tex",
        }
    }

    /// Export target beside `document`, never the document itself.
    pub fn default_path(self, document: &Path) -> PathBuf {
        let path = document.with_extension(self.extension());
        if path == document {
            document.with_extension(format!("table.{}", self.extension()))
        } else {
            path
        }
    }
}

/// Serialize the table's data rows.
///
/// # Errors
/// Returns an error if the CSV writer fails.
pub fn export(table: &Table, format: ExportFormat) -> Result<String> {
    let grid = table.to_grid();
    debug!(?format, rows = grid.len(), "export table");
    match format {
        ExportFormat::Csv => to_csv(&grid),
        ExportFormat::Tsv => Ok(to_tsv(&grid)),
        ExportFormat::Html => Ok(to_html(&grid)),
        ExportFormat::Latex => Ok(to_latex(&grid, table.column_count())),
    }
}

fn to_csv(grid: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    for row in grid {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|err| Error::Io(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn to_tsv(grid: &[Vec<String>]) -> String {
    grid.iter().map(|row| format!("{}\n", row.join("\t"))).collect()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn to_html(grid: &[Vec<String>]) -> String {
    let mut out = String::from("<table>\n");
    let mut rows = grid.iter();
    if let Some(header) = rows.next() {
        out.push_str("  <thead>\n    <tr>");
        for cell in header {
            let _ = write!(out, "<th>{}</th>", escape_html(cell));
        }
        out.push_str("</tr>\n  </thead>\n");
    }
    out.push_str("  <tbody>\n");
    for row in rows {
        out.push_str("    <tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape_html(cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("  </tbody>\n</table>\n");
    out
}

fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '&' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn to_latex(grid: &[Vec<String>], columns: usize) -> String {
    let mut out = format!("\\begin{{tabular}}{{{}}}\n", "l".repeat(columns));
    for (idx, row) in grid.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| escape_latex(c)).collect();
        let _ = writeln!(out, "{} \\\\", cells.join(" & "));
        if idx == 0 {
            out.push_str("\\hline\n");
        }
    }
    out.push_str("\\end{tabular}\n");
    out
}

/// How pasted text is split into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Tab,
    Comma,
    /// Two or more consecutive spaces.
    Spaces,
    /// One cell per line.
    Line,
}

/// Pick a delimiter from the first line: tab, then comma, then space runs.
pub fn detect_delimiter(first_line: &str) -> Delimiter {
    if first_line.contains('\t') {
        Delimiter::Tab
    } else if first_line.contains(',') {
        Delimiter::Comma
    } else if SPACE_RUN_RE.is_match(first_line.trim()) {
        Delimiter::Spaces
    } else {
        Delimiter::Line
    }
}

fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // table cells are single-line
        rows.push(record.iter().map(|f| f.replace(['\r', '\n'], " ")).collect());
    }
    Ok(rows)
}

/// Split pasted text into rows of cells.
///
/// # Errors
/// Returns an error if comma-delimited input is not valid CSV.
pub fn parse_pasted(text: &str) -> Result<Vec<Vec<String>>> {
    let Some(first) = text.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    let delimiter = detect_delimiter(first);
    debug!(?delimiter, "import delimiter");
    if delimiter == Delimiter::Comma {
        return parse_csv(text);
    }
    let rows = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| match delimiter {
            Delimiter::Tab => line.split('\t').map(|c| c.trim().to_string()).collect(),
            Delimiter::Spaces => SPACE_RUN_RE
                .split(line.trim())
                .map(ToString::to_string)
                .collect(),
            Delimiter::Comma | Delimiter::Line => vec![line.trim().to_string()],
        })
        .collect();
    Ok(rows)
}

/// Turn pasted text into formatted table lines, with a separator after the
/// first row. Returns no lines for blank input.
///
/// # Errors
/// Returns an error if comma-delimited input is not valid CSV.
pub fn import(text: &str, syntax: Syntax) -> Result<Vec<String>> {
    let parsed = parse_pasted(text)?;
    if parsed.is_empty() {
        return Ok(Vec::new());
    }
    let mut rows: Vec<Row> = parsed.into_iter().map(Row::data).collect();
    rows.insert(1, Row::separator());
    Ok(Table::from_rows(rows, 0, String::new(), syntax).format_lines())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> Table {
        let lines: Vec<String> = text.lines().map(ToString::to_string).collect();
        Table::locate(&lines, 0, Syntax::Org).unwrap()
    }

    #[test]
    fn test_csv_quotes_only_when_needed() {
        let t = table("| name | note |\n|---|\n| a, b | say \"hi\" |\n| plain | x |");
        let csv = export(&t, ExportFormat::Csv).unwrap();
        assert_eq!(csv, "name,note\n\"a, b\",\"say \"\"hi\"\"\"\nplain,x\n");
    }

    #[test]
    fn test_tsv_is_unquoted() {
        let t = table("| a, b | \"q\" |\n| c | d |");
        assert_eq!(export(&t, ExportFormat::Tsv).unwrap(), "a, b\t\"q\"\nc\td\n");
    }

    #[test]
    fn test_html_has_head_and_body() {
        let t = table("| h1 | h2 |\n|---+---|\n| <b> | a & b |");
        let html = export(&t, ExportFormat::Html).unwrap();
        assert_eq!(
            html,
            "<table>\n  <thead>\n    <tr><th>h1</th><th>h2</th></tr>\n  </thead>\n  <tbody>\n    <tr><td>&lt;b&gt;</td><td>a &amp; b</td></tr>\n  </tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_latex_escapes_and_single_hline() {
        let t = table("| item | pct |\n|---+---|\n| a_b | 50% |\n| c & d | 1 |");
        let tex = export(&t, ExportFormat::Latex).unwrap();
        assert_eq!(
            tex,
            "\\begin{tabular}{ll}\nitem & pct \\\\\n\\hline\na\\_b & 50\\% \\\\\nc \\& d & 1 \\\\\n\\end{tabular}\n"
        );
        assert_eq!(tex.matches("\\hline").count(), 1);
    }

    #[test]
    fn test_spec_rows_are_not_exported() {
        let t = table("| <l> | <5> |\n| a | b |");
        assert_eq!(export(&t, ExportFormat::Tsv).unwrap(), "a\tb\n");
    }

    #[test]
    fn test_detect_delimiter_priority() {
        assert_eq!(detect_delimiter("a\tb,c"), Delimiter::Tab);
        assert_eq!(detect_delimiter("a,b  c"), Delimiter::Comma);
        assert_eq!(detect_delimiter("a  b"), Delimiter::Spaces);
        assert_eq!(detect_delimiter("a b"), Delimiter::Line);
    }

    #[test]
    fn test_import_csv_inserts_separator() {
        let lines = import("name,qty\n\"Smith, J\",3\n", Syntax::Org).unwrap();
        assert_eq!(
            lines,
            vec![
                "| name     | qty |",
                "|----------+-----|",
                "| Smith, J | 3   |",
            ]
        );
    }

    #[test]
    fn test_import_space_runs_and_tabs() {
        let spaced = import("a  b\nccc    d", Syntax::Markdown).unwrap();
        assert_eq!(spaced, vec!["| a   | b |", "|-----|---|", "| ccc | d |"]);

        let tabbed = import("x\ty\n1\t2\n", Syntax::Org).unwrap();
        assert_eq!(tabbed, vec!["| x | y |", "|---+---|", "| 1 | 2 |"]);
    }

    #[test]
    fn test_import_single_row_still_gets_separator() {
        let lines = import("only", Syntax::Org).unwrap();
        assert_eq!(lines, vec!["| only |", "|------|"]);
    }

    #[test]
    fn test_import_blank_is_empty() {
        assert!(import("  \n\n", Syntax::Org).unwrap().is_empty());
    }

    #[test]
    fn test_csv_round_trip_preserves_values() {
        let source = "id,label\n1,\"comma, inside\"\n2,\"quote \"\" inside\"\n";
        let lines = import(source, Syntax::Org).unwrap();
        let table = Table::locate(&lines, 0, Syntax::Org).unwrap();
        let exported = export(&table, ExportFormat::Csv).unwrap();
        assert_eq!(parse_csv(&exported).unwrap(), parse_csv(source).unwrap());
    }

    #[test]
    fn test_default_path_sits_beside_document() {
        assert_eq!(
            ExportFormat::Csv.default_path(Path::new("notes/plan.org")),
            PathBuf::from("notes/plan.csv")
        );
        assert_eq!(
            ExportFormat::Latex.default_path(Path::new("README.md")),
            PathBuf::from("README.tex")
        );
        assert_eq!(
            ExportFormat::Csv.default_path(Path::new("data.csv")),
            PathBuf::from("data.table.csv")
        );
    }
}
