//! Search parameters and normalization helpers used by the filters.

use regex::Regex;
use std::sync::OnceLock;

/// A token that must appear with a given part-of-speech tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagQuery {
    pub token: String,
    pub tag: String,
}

/// What to look for. Name lists are stored normalized (lowercase unless
/// `case_sensitive`), sorted and deduped for binary search.
#[derive(Clone, Debug)]
pub struct SearchSpec {
    pub subreddits: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub top_level_only: bool,
    pub comment_regex: Option<String>, // comment bodies
    pub post_regex: Option<String>,    // submission selftext
    pub title_regex: Option<String>,
    pub flair_regex: Option<String>,
    pub author_regex: Option<String>,
    pub case_sensitive: bool,
    pub include_quoted: bool,
    pub tag: Option<TagQuery>,
    pub popularity: Option<i64>,
    pub review_filters: bool, // false skips the secondary review checks
}

impl Default for SearchSpec {
    fn default() -> Self {
        Self {
            subreddits: None,
            authors: None,
            top_level_only: false,
            comment_regex: None,
            post_regex: None,
            title_regex: None,
            flair_regex: None,
            author_regex: None,
            case_sensitive: false,
            include_quoted: false,
            tag: None,
            popularity: None,
            review_filters: true,
        }
    }
}

impl SearchSpec {
    /// Normalize name lists, then sort + dedup for binary_search-based filters.
    pub fn normalize(mut self) -> Self {
        let case_sensitive = self.case_sensitive;
        let norm_sort_dedup = |v: &mut Option<Vec<String>>| {
            if let Some(list) = v.as_mut() {
                for s in list.iter_mut() {
                    *s = normalize_name(s, case_sensitive);
                }
                list.retain(|s| !s.is_empty());
                list.sort();
                list.dedup();
            }
        };
        norm_sort_dedup(&mut self.subreddits);
        norm_sort_dedup(&mut self.authors);
        self
    }
}

/// Trim, drop an `r/` or `u/` prefix, and lowercase unless case-sensitive.
#[inline]
pub fn normalize_name(s: &str, case_sensitive: bool) -> String {
    let s = s.trim();
    let s = s
        .strip_prefix("r/")
        .or_else(|| s.strip_prefix("u/"))
        .or_else(|| s.strip_prefix("/r/"))
        .or_else(|| s.strip_prefix("/u/"))
        .unwrap_or(s);
    if case_sensitive { s.to_string() } else { s.to_lowercase() }
}

/// Rewrite a pattern anchored with `^` so it still matches when the text opens
/// with one or more quoted paragraphs. A leading inline-flag group such as
/// `(?i)` is kept in front; look-behind prefixes are not recognized since
/// `regex` does not support them.
///
/// `^foo` becomes `^(?:(?:&gt;|>).+\n\n)*foo`.
pub fn allow_leading_quotes(pattern: &str) -> String {
    static ANCHORED: OnceLock<Regex> = OnceLock::new();
    let anchored = ANCHORED.get_or_init(|| Regex::new(r"(?s)^(\(\?[a-zA-Z]+\))?\^(.+)$").unwrap());
    match anchored.captures(pattern) {
        Some(caps) => {
            let flags = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let rest = &caps[2];
            let rewritten = format!(r"{flags}^(?:(?:&gt;|>).+\n\n)*{rest}");
            tracing::info!(from = pattern, to = %rewritten, "Anchored regex rewritten to skip leading quotes");
            rewritten
        }
        None => pattern.to_string(),
    }
}
