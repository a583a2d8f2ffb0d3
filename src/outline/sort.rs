//! Sorting outline entries.
//!
//! An entry is a heading plus its whole subtree. Sorting reorders sibling
//! entries and replaces their line range in one edit; text between the
//! parent heading and its first child stays where it is.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::outline::{Heading, Outline};
use crate::sort::{self, SortValue};
use crate::table::{Edit, NotApplicable, Syntax};

static DEADLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DEADLINE:\s*(<[^>\n]*>)").expect("valid deadline regex"));

static SCHEDULED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SCHEDULED:\s*(<[^>\n]*>)").expect("valid scheduled regex"));

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*CLOCK:.*=>\s*(\d+):(\d{2})\s*$").expect("valid clock regex")
});

static PROPERTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:([^:\s]+):\s*(.*?)\s*$").expect("valid property regex"));

/// What outline entries are compared by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    /// Title without TODO keyword, priority and tags.
    Alpha,
    /// Leading number of the title.
    Numeric,
    /// First timestamp in the entry, active preferred.
    Time,
    Deadline,
    Scheduled,
    /// Priority cookie, `A` first.
    Priority,
    /// Position of the TODO keyword in the configured sequence.
    Todo,
    /// First date opening a body line.
    Creation,
    /// Total clocked minutes.
    Clock,
    /// Value of a named property.
    Property,
}

impl SortKey {
    /// Decode an org-style key letter. Upper case means reverse.
    pub fn from_key(key: char) -> Option<(Self, bool)> {
        let kind = match key.to_ascii_lowercase() {
            'a' => Self::Alpha,
            'n' => Self::Numeric,
            't' => Self::Time,
            'd' => Self::Deadline,
            's' => Self::Scheduled,
            'p' => Self::Priority,
            'o' => Self::Todo,
            'c' => Self::Creation,
            'k' => Self::Clock,
            'r' => Self::Property,
            _ => return None,
        };
        Some((kind, key.is_ascii_uppercase()))
    }
}

/// A fully specified entry sort.
#[derive(Debug, Clone, Copy)]
pub struct EntrySort<'a> {
    pub key: SortKey,
    pub reverse: bool,
    /// Property name, required by [`SortKey::Property`].
    pub property: Option<&'a str>,
    pub todo_keywords: &'a [String],
    pub syntax: Syntax,
}

/// Sibling entries chosen for sorting.
struct Scope {
    entries: Vec<usize>,
    end: usize,
}

fn resolve_scope(
    outline: &Outline,
    cursor_line: usize,
    selection: Option<Range<usize>>,
) -> Result<Scope, NotApplicable> {
    if let Some(selection) = selection.filter(|s| !s.is_empty()) {
        let entries = outline.within(selection);
        let last = *entries.last().ok_or(NotApplicable::NoSortScope)?;
        return Ok(Scope {
            end: outline.subtree_end(last),
            entries,
        });
    }

    let first = outline.headings.first().ok_or(NotApplicable::NoSortScope)?;
    if cursor_line < first.line {
        return Ok(Scope {
            entries: outline.top_level(),
            end: outline.line_count,
        });
    }

    // a heading line owns itself, so this covers both heading and body
    let parent = outline
        .owner_of(cursor_line)
        .ok_or(NotApplicable::NoSortScope)?;
    Ok(Scope {
        entries: outline.children(parent),
        end: outline.subtree_end(parent),
    })
}

/// Text of an entry's own section, heading included, children excluded.
fn section<'a>(lines: &'a [String], outline: &Outline, idx: usize) -> &'a [String] {
    let start = outline.headings[idx].line;
    &lines[start..outline.section_end(idx)]
}

fn planning(section: &[String], re: &Regex) -> Option<SortValue> {
    section.iter().find_map(|line| {
        let caps = re.captures(line)?;
        sort::first_timestamp(&caps[1]).map(SortValue::Date)
    })
}

fn property(section: &[String], name: &str) -> Option<SortValue> {
    let mut in_drawer = false;
    for line in section {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
            in_drawer = true;
        } else if trimmed.eq_ignore_ascii_case(":END:") {
            if in_drawer {
                return None;
            }
        } else if in_drawer
            && let Some(caps) = PROPERTY_RE.captures(line)
            && caps[1].eq_ignore_ascii_case(name)
        {
            let value = &caps[2];
            return (!value.is_empty()).then(|| SortValue::Text(value.to_string()));
        }
    }
    None
}

#[allow(clippy::cast_precision_loss)]
fn clocked_minutes(section: &[String]) -> Option<SortValue> {
    let mut found = false;
    let mut total = 0u64;
    for caps in section.iter().filter_map(|l| CLOCK_RE.captures(l)) {
        let hours: u64 = caps[1].parse().unwrap_or(u64::MAX);
        let minutes: u64 = caps[2].parse().unwrap_or(0);
        total = total.saturating_add(hours.saturating_mul(60).saturating_add(minutes));
        found = true;
    }
    found.then(|| SortValue::Number(total as f64))
}

fn creation(section: &[String]) -> Option<SortValue> {
    section.iter().skip(1).find_map(|line| {
        let indent = line.len() - line.trim_start().len();
        sort::timestamps(line)
            .first()
            .filter(|ts| ts.start == indent)
            .map(|ts| SortValue::Date(ts.instant))
    })
}

fn entry_key(
    heading: &Heading,
    section: &[String],
    request: &EntrySort<'_>,
    property_name: &str,
) -> Option<SortValue> {
    match request.key {
        SortKey::Alpha => {
            (!heading.title.is_empty()).then(|| SortValue::Text(heading.title.clone()))
        }
        SortKey::Numeric => sort::leading_number(&heading.title).map(SortValue::Number),
        SortKey::Time => sort::first_timestamp(&section.join("\n")).map(SortValue::Date),
        SortKey::Deadline => planning(section, &DEADLINE_RE),
        SortKey::Scheduled => planning(section, &SCHEDULED_RE),
        SortKey::Priority => heading
            .priority
            .map(|p| SortValue::Number(f64::from(u32::from(p.to_ascii_uppercase())))),
        SortKey::Todo => {
            let todo = heading.todo.as_ref()?;
            request
                .todo_keywords
                .iter()
                .position(|k| k == todo)
                .and_then(|idx| u32::try_from(idx).ok())
                .map(|idx| SortValue::Number(f64::from(idx)))
        }
        SortKey::Creation => creation(section),
        SortKey::Clock => clocked_minutes(section),
        SortKey::Property => property(section, property_name),
    }
}

/// Sort sibling entries at the cursor, or in the selection if one is given.
///
/// Returns `Ok(None)` when the entries are already in order.
///
/// # Errors
/// Returns [`NotApplicable`] when no scope can be resolved, fewer than two
/// entries are found, or a property sort has no property name.
pub fn sort_entries(
    lines: &[String],
    cursor_line: usize,
    selection: Option<Range<usize>>,
    request: &EntrySort<'_>,
) -> Result<Option<Edit>, NotApplicable> {
    let property_name = match (request.key, request.property) {
        (SortKey::Property, None) => return Err(NotApplicable::NoProperty),
        (_, name) => name.unwrap_or_default(),
    };

    let outline = Outline::parse(lines, request.syntax, request.todo_keywords);
    let scope = resolve_scope(&outline, cursor_line, selection)?;
    if scope.entries.len() < 2 {
        debug!(entries = scope.entries.len(), "too few entries to sort");
        return Err(NotApplicable::TooFewEntries);
    }

    // trailing blank lines at end of document stay put
    let mut end = scope.end;
    if end == lines.len() {
        while end > outline.headings[scope.entries[scope.entries.len() - 1]].line + 1
            && lines[end - 1].trim().is_empty()
        {
            end -= 1;
        }
    }

    let ranges: Vec<Range<usize>> = scope
        .entries
        .iter()
        .enumerate()
        .map(|(pos, &idx)| {
            let start = outline.headings[idx].line;
            let stop = scope
                .entries
                .get(pos + 1)
                .map_or(end, |&next| outline.headings[next].line);
            start..stop
        })
        .collect();

    let keys: Vec<Option<SortValue>> = scope
        .entries
        .iter()
        .map(|&idx| {
            entry_key(
                &outline.headings[idx],
                section(lines, &outline, idx),
                request,
                property_name,
            )
        })
        .collect();

    let order = sort::sorted_order(&keys, request.reverse);
    if sort::is_identity(&order) {
        debug!(key = ?request.key, "entries already sorted");
        return Ok(None);
    }

    let range = ranges[0].start..end;
    let new_lines: Vec<String> = order
        .iter()
        .flat_map(|&pos| lines[ranges[pos].clone()].iter().cloned())
        .collect();
    let cursor_line = if range.contains(&cursor_line) {
        range.start
    } else {
        cursor_line
    };
    debug!(key = ?request.key, entries = order.len(), "sorted entries");
    Ok(Some(Edit {
        range,
        lines: new_lines,
        cursor_line,
        cursor_column: 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "#+TITLE: notes
* TODO [#B] beta :work:
body
* alpha
** child two
** child one
* DONE [#A] gamma
DEADLINE: <2024-01-02 Tue>";

    fn doc(text: &str) -> Vec<String> {
        text.lines().map(ToString::to_string).collect()
    }

    fn keywords() -> Vec<String> {
        vec!["TODO".to_string(), "DONE".to_string()]
    }

    fn run(
        lines: &[String],
        cursor: usize,
        selection: Option<Range<usize>>,
        key: char,
        property: Option<&str>,
    ) -> Result<Option<Edit>, NotApplicable> {
        let keywords = keywords();
        let (key, reverse) = SortKey::from_key(key).unwrap();
        let request = EntrySort {
            key,
            reverse,
            property,
            todo_keywords: &keywords,
            syntax: Syntax::Org,
        };
        sort_entries(lines, cursor, selection, &request)
    }

    fn titles(edit: &Edit) -> Vec<&str> {
        edit.lines
            .iter()
            .filter(|l| l.starts_with('*'))
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_before_first_heading_sorts_top_level() {
        let lines = doc(DOC);
        let edit = run(&lines, 0, None, 'a', None).unwrap().unwrap();
        assert_eq!(edit.range, 1..8);
        assert_eq!(
            edit.lines,
            doc("* alpha\n** child two\n** child one\n* TODO [#B] beta :work:\nbody\n* DONE [#A] gamma\nDEADLINE: <2024-01-02 Tue>")
        );
        assert_eq!(edit.cursor_line, 0);
    }

    #[test]
    fn test_on_heading_sorts_children() {
        let lines = doc(DOC);
        let edit = run(&lines, 3, None, 'a', None).unwrap().unwrap();
        assert_eq!(edit.range, 4..6);
        assert_eq!(edit.lines, doc("** child one\n** child two"));
        assert_eq!(edit.cursor_line, 3);
    }

    #[test]
    fn test_in_body_sorts_owner_children() {
        let lines = doc("* parent\nintro text\n** b\n** a\n* other");
        let edit = run(&lines, 1, None, 'a', None).unwrap().unwrap();
        assert_eq!(edit.range, 2..4);
        assert_eq!(edit.lines, doc("** a\n** b"));
    }

    #[test]
    fn test_childless_entry_is_not_applicable() {
        let lines = doc(DOC);
        assert_eq!(run(&lines, 2, None, 'a', None), Err(NotApplicable::TooFewEntries));
    }

    #[test]
    fn test_no_headings_is_not_applicable() {
        let lines = doc("just text\nmore");
        assert_eq!(run(&lines, 0, None, 'a', None), Err(NotApplicable::NoSortScope));
    }

    #[test]
    fn test_selection_sorts_shallowest_headings() {
        let lines = doc(DOC);
        let edit = run(&lines, 0, Some(4..6), 'a', None).unwrap().unwrap();
        assert_eq!(edit.range, 4..6);
        assert_eq!(edit.lines, doc("** child one\n** child two"));
    }

    #[test]
    fn test_priority_absent_sorts_last_both_ways() {
        let lines = doc(DOC);
        let up = run(&lines, 0, None, 'p', None).unwrap().unwrap();
        assert_eq!(
            titles(&up),
            vec!["* DONE [#A] gamma", "* TODO [#B] beta :work:", "* alpha", "** child two", "** child one"]
        );
        let down = run(&lines, 0, None, 'P', None).unwrap().unwrap();
        assert_eq!(
            titles(&down),
            vec!["* TODO [#B] beta :work:", "* DONE [#A] gamma", "* alpha", "** child two", "** child one"]
        );
    }

    #[test]
    fn test_deadline_and_todo_keys() {
        let lines = doc(DOC);
        let by_deadline = run(&lines, 0, None, 'd', None).unwrap().unwrap();
        assert_eq!(by_deadline.lines[0], "* DONE [#A] gamma");
        assert_eq!(by_deadline.lines[2], "* TODO [#B] beta :work:");

        let by_todo = run(&lines, 0, None, 'o', None).unwrap().unwrap();
        let top: Vec<&str> = titles(&by_todo)
            .into_iter()
            .filter(|t| !t.starts_with("**"))
            .collect();
        assert_eq!(top, vec!["* TODO [#B] beta :work:", "* DONE [#A] gamma", "* alpha"]);
    }

    #[test]
    fn test_sorted_scope_issues_no_edit() {
        let lines = doc("* a\n* b\n* c");
        assert_eq!(run(&lines, 0, Some(0..3), 'a', None), Ok(None));
    }

    #[test]
    fn test_equal_keys_keep_order() {
        let lines = doc("* x 1\n* y\n* x 2\n* 0");
        let edit = run(&lines, 0, Some(0..4), 'n', None);
        // only "0" has a leading number
        assert_eq!(edit.unwrap().unwrap().lines, doc("* 0\n* x 1\n* y\n* x 2"));
    }

    #[test]
    fn test_numeric_title() {
        let lines = doc("* 10 apples\n* 9 pears");
        let edit = run(&lines, 0, Some(0..2), 'n', None).unwrap().unwrap();
        assert_eq!(edit.lines, doc("* 9 pears\n* 10 apples"));
    }

    #[test]
    fn test_clock_sums_minutes() {
        let lines = doc(
            "* long\nCLOCK: [2024-01-01 Mon 09:00]--[2024-01-01 Mon 10:30] =>  1:30\n* short\nCLOCK: [2024-01-02 Tue 09:00]--[2024-01-02 Tue 09:20] =>  0:20\nCLOCK: [2024-01-03 Wed 09:00]--[2024-01-03 Wed 09:20] =>  0:20",
        );
        let edit = run(&lines, 0, Some(0..5), 'k', None).unwrap().unwrap();
        assert_eq!(edit.lines[0], "* short");
    }

    #[test]
    fn test_clock_with_huge_hours_saturates() {
        let lines = doc(
            "* small\nCLOCK: [2024-01-01 Mon 09:00]--[2024-01-01 Mon 10:00] =>  1:00\n* huge\nCLOCK: [2024-01-01 Mon 09:00]--[2024-01-01 Mon 10:00] => 99999999999:59\nCLOCK: [2024-01-01 Mon 09:00]--[2024-01-01 Mon 10:00] => 99999999999999999999999:00",
        );
        let edit = run(&lines, 0, Some(0..5), 'K', None).unwrap().unwrap();
        assert_eq!(titles(&edit), vec!["* huge", "* small"]);
    }

    #[test]
    fn test_creation_needs_date_at_line_start() {
        let lines = doc("* late\n[2024-05-01 Wed] created\n* early\n  [2023-01-01 Sun]\n* none\nsee [2020-01-01]");
        let edit = run(&lines, 0, Some(0..6), 'c', None).unwrap().unwrap();
        assert_eq!(titles(&edit), vec!["* early", "* late", "* none"]);
    }

    #[test]
    fn test_property_sort() {
        let lines = doc(
            "* one\n:PROPERTIES:\n:Cost: beta\n:END:\n* two\n:PROPERTIES:\n:COST: Alpha\n:END:\n* three",
        );
        let edit = run(&lines, 0, Some(0..9), 'r', Some("cost")).unwrap().unwrap();
        assert_eq!(titles(&edit), vec!["* two", "* one", "* three"]);
        assert_eq!(run(&lines, 0, Some(0..9), 'r', None), Err(NotApplicable::NoProperty));
    }

    #[test]
    fn test_trailing_blank_lines_stay_at_end() {
        let lines = doc("* b\n* a\n\n");
        let edit = run(&lines, 0, Some(0..2), 'a', None).unwrap().unwrap();
        assert_eq!(edit.range, 0..2);
        assert_eq!(edit.lines, doc("* a\n* b"));
    }

    #[test]
    fn test_key_letters() {
        assert_eq!(SortKey::from_key('k'), Some((SortKey::Clock, false)));
        assert_eq!(SortKey::from_key('R'), Some((SortKey::Property, true)));
        assert_eq!(SortKey::from_key('z'), None);
    }
}
