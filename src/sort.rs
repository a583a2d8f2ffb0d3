//! Sort keys shared by table row sorting and outline entry sorting.
//!
//! A key is either present ([`SortValue`]) or absent. Present keys always
//! come before absent ones, whichever direction the sort runs in, and equal
//! keys keep their original order.

use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([<\[])(\d{4})-(\d{2})-(\d{2})([^<>\[\]\n]*?)([>\]])").expect("valid timestamp regex")
});

static CLOCK_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid time regex"));

static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+))").expect("valid number regex"));

/// A comparable sort key.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Date(NaiveDateTime),
    Number(f64),
    Text(String),
}

impl SortValue {
    const fn rank(&self) -> u8 {
        match self {
            Self::Date(_) => 0,
            Self::Number(_) => 1,
            Self::Text(_) => 2,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => compare_text(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Case-folded comparison, falling back to exact order for ties.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Compare two optional keys. `reverse` flips present keys only.
pub fn compare(a: Option<&SortValue>, b: Option<&SortValue>, reverse: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = a.compare(b);
            if reverse { ordering.reverse() } else { ordering }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable permutation that sorts `keys`.
pub fn sorted_order(keys: &[Option<SortValue>], reverse: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| compare(keys[a].as_ref(), keys[b].as_ref(), reverse));
    order
}

/// True if `order` leaves everything where it was.
pub fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(pos, idx)| pos == *idx)
}

/// A timestamp found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub instant: NaiveDateTime,
    /// `<...>` timestamps are active, `[...]` ones inactive.
    pub active: bool,
    /// Byte offset of the opening bracket.
    pub start: usize,
}

/// All well-formed timestamps in `text`, in order.
pub fn timestamps(text: &str) -> Vec<Timestamp> {
    TIMESTAMP_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let open = caps.get(1)?.as_str();
            let close = caps.get(6)?.as_str();
            let active = match (open, close) {
                ("<", ">") => true,
                ("[", "]") => false,
                _ => return None,
            };
            let date = NaiveDate::from_ymd_opt(
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
                caps[4].parse().ok()?,
            )?;
            let time = CLOCK_TIME_RE
                .captures(caps.get(5).map_or("", |m| m.as_str()))
                .and_then(|t| NaiveTime::from_hms_opt(t[1].parse().ok()?, t[2].parse().ok()?, 0))
                .unwrap_or(NaiveTime::MIN);
            Some(Timestamp {
                instant: date.and_time(time),
                active,
                start: caps.get(0)?.start(),
            })
        })
        .collect()
}

/// First active timestamp, or the first inactive one if none is active.
pub fn first_timestamp(text: &str) -> Option<NaiveDateTime> {
    let found = timestamps(text);
    found
        .iter()
        .find(|ts| ts.active)
        .or_else(|| found.first())
        .map(|ts| ts.instant)
}

/// Numeric prefix of `text`, e.g. `12.5` for `"12.5 kg"`.
pub fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}
