//! Column cookies: `<l>`, `<c10>`, `<r>`, `<5>`.
//!
//! A letter sets the alignment, digits after a letter set a minimum width,
//! and bare digits set a maximum display width used only by the truncation
//! projection.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::width::Alignment;

static COOKIE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<([lcr]?)(\d*)>$").expect("valid cookie regex"));

/// Largest width a cookie may declare.
pub const MAX_COOKIE_WIDTH: usize = 1000;

/// A parsed column cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cookie {
    pub alignment: Alignment,
    pub min_width: Option<usize>,
    pub max_width: Option<usize>,
    #[serde(skip)]
    explicit_alignment: bool,
}

impl Cookie {
    /// Alignment-only cookie.
    pub const fn aligned(alignment: Alignment) -> Self {
        Self {
            alignment,
            min_width: None,
            max_width: None,
            explicit_alignment: true,
        }
    }

    /// Alignment plus minimum width.
    pub const fn with_min(alignment: Alignment, min_width: usize) -> Self {
        Self {
            alignment,
            min_width: Some(min_width),
            max_width: None,
            explicit_alignment: true,
        }
    }

    /// Maximum display width, left aligned.
    pub const fn with_max(max_width: usize) -> Self {
        Self {
            alignment: Alignment::Left,
            min_width: None,
            max_width: Some(max_width),
            explicit_alignment: false,
        }
    }
}

/// Parse a spec-row cell. Returns `None` for anything that is not a cookie,
/// including the empty cookie `<>`.
pub fn parse(cell: &str) -> Option<Cookie> {
    let caps = COOKIE_RE.captures(cell.trim())?;
    let letter = caps.get(1).map_or("", |m| m.as_str());
    let digits = caps.get(2).map_or("", |m| m.as_str());
    // Widths past the bound are degenerate; treat them as no width.
    let number = digits
        .parse::<usize>()
        .ok()
        .filter(|n| *n <= MAX_COOKIE_WIDTH);

    let alignment = match letter.to_ascii_lowercase().as_str() {
        "l" => Some(Alignment::Left),
        "c" => Some(Alignment::Center),
        "r" => Some(Alignment::Right),
        _ => None,
    };
    match (alignment, number) {
        (Some(alignment), Some(min)) => Some(Cookie::with_min(alignment, min)),
        (Some(alignment), None) => Some(Cookie::aligned(alignment)),
        (None, Some(max)) => Some(Cookie::with_max(max)),
        (None, None) => None,
    }
}

/// True if `cell` is a cookie or the empty cookie `<>`.
pub fn is_cookie(cell: &str) -> bool {
    COOKIE_RE.is_match(cell.trim())
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        if self.explicit_alignment {
            f.write_str(match self.alignment {
                Alignment::Left => "l",
                Alignment::Center => "c",
                Alignment::Right => "r",
            })?;
        }
        if let Some(min) = self.min_width {
            write!(f, "{min}")?;
        } else if let Some(max) = self.max_width {
            write!(f, "{max}")?;
        }
        f.write_str(">")
    }
}

/// Canonical text for a spec-row cell: cookies are normalized, anything
/// else is kept as written.
pub fn format(cell: &str) -> String {
    parse(cell).map_or_else(|| cell.trim().to_string(), |cookie| cookie.to_string())
}
