//! Heading outline of an org or markdown document.
//!
//! Only what entry sorting needs is parsed: heading lines with their level,
//! TODO keyword, priority cookie, title and tags. Section bodies are left as
//! raw lines.

mod sort;

pub use sort::{EntrySort, SortKey, sort_entries};

use std::sync::LazyLock;

use regex::Regex;

use crate::table::Syntax;

static ORG_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*+)(?:[ \t]+(.*?))?[ \t]*$").expect("valid org heading regex")
});

static MD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("valid markdown heading regex")
});

static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[#([A-Za-z0-9])\][ \t]*").expect("valid priority regex"));

static TAGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[ \t]+)(:(?:[\w@#%]+:)+)$").expect("valid tags regex")
});

static ORG_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*#\+(begin|end)_").expect("valid block regex"));

/// A parsed heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Document line of the heading.
    pub line: usize,
    pub level: usize,
    pub todo: Option<String>,
    pub priority: Option<char>,
    /// Title with TODO keyword, priority cookie and tags removed.
    pub title: String,
    pub tags: Vec<String>,
}

/// Parse `text` as a heading, or `None` if it is not one.
pub fn parse_heading(
    text: &str,
    line: usize,
    syntax: Syntax,
    todo_keywords: &[String],
) -> Option<Heading> {
    let re = match syntax {
        Syntax::Org => &ORG_HEADING_RE,
        Syntax::Markdown => &MD_HEADING_RE,
    };
    let caps = re.captures(text)?;
    let level = caps[1].len();
    let mut rest = caps.get(2).map_or("", |m| m.as_str());

    let mut todo = None;
    let first_word = rest.split_whitespace().next().unwrap_or_default();
    if !first_word.is_empty()
        && todo_keywords.iter().any(|k| k == first_word)
        && let Some(after) = rest.strip_prefix(first_word)
    {
        todo = Some(first_word.to_string());
        rest = after.trim_start();
    }

    let mut priority = None;
    if let Some(p) = PRIORITY_RE.captures(rest) {
        priority = p[1].chars().next();
        rest = &rest[p[0].len()..];
    }

    let mut tags = Vec::new();
    if syntax == Syntax::Org
        && let Some(t) = TAGS_RE.captures(rest)
    {
        tags = t[1]
            .split(':')
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string)
            .collect();
        rest = &rest[..t.get(0).map_or(rest.len(), |m| m.start())];
    }

    Some(Heading {
        line,
        level,
        todo,
        priority,
        title: rest.trim().to_string(),
        tags,
    })
}

/// All headings of a document, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub headings: Vec<Heading>,
    line_count: usize,
}

impl Outline {
    /// Parse every heading outside code/src blocks.
    pub fn parse(lines: &[String], syntax: Syntax, todo_keywords: &[String]) -> Self {
        let mut headings = Vec::new();
        let mut in_block = false;
        for (idx, text) in lines.iter().enumerate() {
            match syntax {
                Syntax::Markdown => {
                    let trimmed = text.trim_start();
                    if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                        in_block = !in_block;
                        continue;
                    }
                }
                Syntax::Org => {
                    if let Some(caps) = ORG_BLOCK_RE.captures(text) {
                        in_block = caps[1].eq_ignore_ascii_case("begin");
                        continue;
                    }
                }
            }
            if in_block {
                continue;
            }
            if let Some(heading) = parse_heading(text, idx, syntax, todo_keywords) {
                headings.push(heading);
            }
        }
        Self {
            headings,
            line_count: lines.len(),
        }
    }

    /// Index of the last heading at or above `line`.
    pub fn owner_of(&self, line: usize) -> Option<usize> {
        self.headings.iter().rposition(|h| h.line <= line)
    }

    /// First line after the subtree of heading `idx`.
    pub fn subtree_end(&self, idx: usize) -> usize {
        let level = self.headings[idx].level;
        self.headings[idx + 1..]
            .iter()
            .find(|h| h.level <= level)
            .map_or(self.line_count, |h| h.line)
    }

    /// First line after the section of heading `idx`, before any child.
    pub fn section_end(&self, idx: usize) -> usize {
        self.headings
            .get(idx + 1)
            .map_or(self.line_count, |h| h.line)
    }

    /// Direct children of heading `idx`: the shallowest headings below it.
    pub fn children(&self, idx: usize) -> Vec<usize> {
        let end = self.subtree_end(idx);
        let below: Vec<usize> = (idx + 1..self.headings.len())
            .take_while(|&i| self.headings[i].line < end)
            .collect();
        self.shallowest(&below)
    }

    /// Headings of the smallest level in the document.
    pub fn top_level(&self) -> Vec<usize> {
        let all: Vec<usize> = (0..self.headings.len()).collect();
        self.shallowest(&all)
    }

    /// Headings starting inside `lines`, filtered to their shallowest level.
    pub fn within(&self, lines: std::ops::Range<usize>) -> Vec<usize> {
        let inside: Vec<usize> = (0..self.headings.len())
            .filter(|&i| lines.contains(&self.headings[i].line))
            .collect();
        self.shallowest(&inside)
    }

    fn shallowest(&self, candidates: &[usize]) -> Vec<usize> {
        let Some(level) = candidates.iter().map(|&i| self.headings[i].level).min() else {
            return Vec::new();
        };
        candidates
            .iter()
            .copied()
            .filter(|&i| self.headings[i].level == level)
            .collect()
    }
}
