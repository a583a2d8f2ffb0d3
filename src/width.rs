//! Display width accounting.
//!
//! Every layout decision in the table engine flows through [`char_width`]:
//! a codepoint occupies 0, 1 or 2 terminal columns. The classification is a
//! fixed range table so that tables written by other tools line up the same
//! way here.

use std::ops::RangeInclusive;

use serde::Serialize;
use unicode_width::UnicodeWidthChar;

/// Horizontal alignment of a cell within its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

const ZERO_WIDTH: &[RangeInclusive<u32>] = &[
    0x200C..=0x200D,   // ZWNJ, ZWJ
    0xFE00..=0xFE0F,   // variation selectors
    0xE0100..=0xE01EF, // variation selectors supplement
];

const DOUBLE_WIDTH: &[RangeInclusive<u32>] = &[
    0x2600..=0x26FF,   // miscellaneous symbols
    0x2700..=0x27BF,   // dingbats
    0x3000..=0x303F,   // CJK symbols and punctuation
    0x3400..=0x4DBF,   // CJK extension A
    0x4E00..=0x9FFF,   // CJK unified ideographs
    0xF900..=0xFAFF,   // CJK compatibility ideographs
    0xFF00..=0xFF60,   // fullwidth forms
    0xFFE0..=0xFFE6,   // fullwidth signs
    0x1F1E6..=0x1F1FF, // regional indicators
    0x1F300..=0x1F5FF, // symbols and pictographs
    0x1F600..=0x1F64F, // emoticons
    0x1F680..=0x1F6FF, // transport and map
    0x1F900..=0x1F9FF, // supplemental symbols and pictographs
    0x1FA70..=0x1FAFF, // symbols and pictographs extended-A
    0x20000..=0x3134F, // CJK extensions B..G
];

fn in_ranges(ranges: &[RangeInclusive<u32>], cp: u32) -> bool {
    ranges.iter().any(|range| range.contains(&cp))
}

/// Number of display columns a single codepoint occupies.
pub fn char_width(ch: char) -> usize {
    let cp = u32::from(ch);
    if in_ranges(ZERO_WIDTH, cp) {
        return 0;
    }
    if in_ranges(DOUBLE_WIDTH, cp) || ch.width() == Some(2) {
        return 2;
    }
    1
}

/// Display width of a string, summed per codepoint.
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Pad `s` with spaces on the right up to `target` columns.
pub fn pad_end(s: &str, target: usize) -> String {
    let pad = target.saturating_sub(str_width(s));
    let mut out = String::with_capacity(s.len() + pad);
    out.push_str(s);
    out.push_str(&" ".repeat(pad));
    out
}

/// Pad `s` with spaces on the left up to `target` columns.
pub fn pad_start(s: &str, target: usize) -> String {
    let pad = target.saturating_sub(str_width(s));
    let mut out = String::with_capacity(s.len() + pad);
    out.push_str(&" ".repeat(pad));
    out.push_str(s);
    out
}

/// Center `s` in `target` columns. An odd leftover column goes to the right.
pub fn center(s: &str, target: usize) -> String {
    let padding = target.saturating_sub(str_width(s));
    let left = padding / 2;
    let right = padding - left;
    format!("{}{s}{}", " ".repeat(left), " ".repeat(right))
}

/// Align `s` within `target` columns. Never truncates.
pub fn align(s: &str, target: usize, alignment: Alignment) -> String {
    match alignment {
        Alignment::Left => pad_end(s, target),
        Alignment::Right => pad_start(s, target),
        Alignment::Center => center(s, target),
    }
}

/// Byte length of the longest prefix of `s` that fits in `max` columns.
pub fn prefix_within(s: &str, max: usize) -> usize {
    let mut used = 0;
    for (idx, ch) in s.char_indices() {
        let w = char_width(ch);
        if used + w > max {
            return idx;
        }
        used += w;
    }
    s.len()
}

/// Byte offset of display column `column` in `s`, clamped to the end.
pub fn byte_at_column(s: &str, column: usize) -> usize {
    let mut used = 0;
    for (idx, ch) in s.char_indices() {
        if used >= column {
            return idx;
        }
        used += char_width(ch);
    }
    s.len()
}
