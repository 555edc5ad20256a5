//! Regex match spans over a text field, with block-quote exclusion.
//!
//! Reddit marks quoted lines with a leading `>`, which the dumps store HTML-escaped
//! as `&gt;`. A match whose line (up to the match end) starts with either marker
//! was merely quoted by the author and is dropped unless quotes are included.

use regex::Regex;
use std::fmt;

const QUOTE_MARKERS: [&str; 2] = ["&gt;", ">"];

/// Half-open byte range `[start, end)` of one regex match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// All non-overlapping matches of `re` in `text`, in order.
pub fn find_all_spans<'t>(text: &'t str, re: &'t Regex) -> impl Iterator<Item = Span> + 't {
    re.find_iter(text).map(|m| Span::new(m.start(), m.end()))
}

/// True iff the line holding `span.end` begins (after indentation) with a quote marker.
/// Only the current line is examined, never earlier ones.
pub fn inside_quote(text: &str, span: Span) -> bool {
    let end = span.end.min(text.len());
    let line_start = text.as_bytes()[..end]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line = text.get(line_start..end).unwrap_or("");
    let line = line.trim_start_matches([' ', '\t']);
    QUOTE_MARKERS.iter().any(|m| line.starts_with(*m))
}

/// Matches that survive quote exclusion (or all matches when `include_quoted`).
pub fn qualifying_spans<'t>(
    text: &'t str,
    re: &'t Regex,
    include_quoted: bool,
) -> impl Iterator<Item = Span> + 't {
    find_all_spans(text, re).filter(move |s| include_quoted || !inside_quote(text, *s))
}
