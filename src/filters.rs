//! Relevance pipeline (broad criteria, negatives are discarded) and the
//! secondary review checks (nuanced criteria, positives go to manual review).
//!
//! Relevance checks run cheapest / most-likely-to-fail first and stop at the
//! first failure. Deduplication is last because it mutates run state.

use crate::query::{allow_leading_quotes, SearchSpec, TagQuery};
use crate::record::{Record, RecordKind};
use crate::spans::{qualifying_spans, Span};
use crate::state::RunState;
use crate::tagger::Tagger;
use anyhow::{anyhow, Context, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Why an otherwise relevant record was diverted to the review file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewReason {
    LowScore,
    BotGenerated,
}

impl ReviewReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewReason::LowScore => "score below defined threshold",
            ReviewReason::BotGenerated => "non-human generated",
        }
    }
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary quality checks. The popularity check runs first.
pub fn review_reason(record: &Record, popularity_threshold: Option<i64>) -> Option<ReviewReason> {
    if let Some(min) = popularity_threshold {
        if record.meta.score < min {
            return Some(ReviewReason::LowScore);
        }
    }
    if record.primary_text().to_lowercase().contains("i'm a bot") {
        return Some(ReviewReason::BotGenerated);
    }
    None
}

fn compile(pattern: Option<&str>, case_sensitive: bool, what: &str) -> Result<Option<Regex>> {
    pattern
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(!case_sensitive)
                .build()
                .with_context(|| format!("invalid {what} regex: {p}"))
        })
        .transpose()
}

/// Compiled search plus the optional tagging collaborator.
pub struct RelevanceFilter {
    spec: SearchSpec,
    comment_re: Option<Regex>,
    post_re: Option<Regex>,
    title_re: Option<Regex>,
    flair_re: Option<Regex>,
    author_re: Option<Regex>,
    tagger: Option<Box<dyn Tagger>>,
}

impl RelevanceFilter {
    pub fn new(spec: SearchSpec) -> Result<Self> {
        let spec = spec.normalize();
        let cs = spec.case_sensitive;
        let comment = spec.comment_regex.as_deref().map(allow_leading_quotes);
        let post = spec.post_regex.as_deref().map(allow_leading_quotes);
        Ok(Self {
            comment_re: compile(comment.as_deref(), cs, "comment")?,
            post_re: compile(post.as_deref(), cs, "post")?,
            title_re: compile(spec.title_regex.as_deref(), cs, "title")?,
            flair_re: compile(spec.flair_regex.as_deref(), cs, "flair")?,
            author_re: compile(spec.author_regex.as_deref(), cs, "author")?,
            spec,
            tagger: None,
        })
    }

    pub fn with_tagger(mut self, tagger: Box<dyn Tagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn spec(&self) -> &SearchSpec {
        &self.spec
    }

    /// The regex applied to the primary text of records of `kind`, if any.
    pub fn text_regex(&self, kind: RecordKind) -> Option<&Regex> {
        match kind {
            RecordKind::Comment => self.comment_re.as_ref(),
            RecordKind::Submission => self.post_re.as_ref(),
        }
    }

    /// Run the full ordered pipeline. On pass the record's fingerprint is stored
    /// in `state` (and the tally incremented); on any earlier failure `state` is
    /// untouched.
    pub fn check(&mut self, record: &Record, state: &mut RunState) -> Result<bool> {
        if !self.identity_ok(record) {
            return Ok(false);
        }
        if !self.structure_ok(record) {
            return Ok(false);
        }
        if !self.text_ok(record) {
            return Ok(false);
        }
        if !self.field_regexes_ok(record) {
            return Ok(false);
        }
        if !self.tag_ok(record)? {
            return Ok(false);
        }
        Ok(state.admit(record))
    }

    fn identity_ok(&self, record: &Record) -> bool {
        let cs = self.spec.case_sensitive;
        let member = |list: &Vec<String>, value: &str| {
            if cs {
                list.binary_search_by(|s| s.as_str().cmp(value)).is_ok()
            } else {
                list.binary_search(&value.to_lowercase()).is_ok()
            }
        };
        if let Some(subs) = &self.spec.subreddits {
            if !member(subs, &record.meta.subreddit) {
                return false;
            }
        }
        if let Some(authors) = &self.spec.authors {
            if !member(authors, &record.meta.author) {
                return false;
            }
        }
        true
    }

    /// Top-level comments reply directly to a submission (`t3_` parent).
    /// Submissions are top-level by definition.
    fn structure_ok(&self, record: &Record) -> bool {
        if !self.spec.top_level_only {
            return true;
        }
        match record.kind() {
            RecordKind::Submission => true,
            RecordKind::Comment => record.parent_id().map(|p| p.starts_with("t3_")).unwrap_or(false),
        }
    }

    fn text_ok(&self, record: &Record) -> bool {
        let Some(re) = self.text_regex(record.kind()) else { return true };
        let text = record.primary_text();
        if self.spec.include_quoted {
            re.is_match(text)
        } else {
            qualifying_spans(text, re, false).next().is_some()
        }
    }

    fn field_regexes_ok(&self, record: &Record) -> bool {
        let field_matches = |re: &Option<Regex>, field: Option<&str>| match re {
            None => true,
            Some(re) => field.map(|f| re.is_match(f)).unwrap_or(false),
        };
        field_matches(&self.title_re, record.title())
            && field_matches(&self.flair_re, record.flair_text())
            && field_matches(&self.author_re, Some(&record.meta.author))
    }

    fn tag_ok(&mut self, record: &Record) -> Result<bool> {
        let Some(TagQuery { token, tag }) = &self.spec.tag else { return Ok(true) };
        let text = record.primary_text();
        // Cheap pre-filter before calling out to the tagger.
        if !text.contains(token.as_str()) {
            return Ok(false);
        }
        let tagger = self
            .tagger
            .as_mut()
            .ok_or_else(|| anyhow!("a tag search is configured but no tagger was supplied"))?;
        let wanted = token.to_lowercase();
        let tokens = tagger.tag(text).with_context(|| format!("tagging record {}", record.meta.id))?;
        Ok(tokens.iter().any(|t| t.text.to_lowercase() == wanted && t.tag == *tag))
    }

    /// Number of unit items a record contributes to the reservoir: its
    /// qualifying matches, or 1 when no text regex applies.
    pub fn weight(&self, record: &Record) -> usize {
        match self.text_regex(record.kind()) {
            Some(re) => qualifying_spans(record.primary_text(), re, self.spec.include_quoted).count(),
            None => 1,
        }
    }

    /// One entry per output row: every qualifying span, or a single `None`
    /// when no text regex applies.
    pub fn row_spans(&self, record: &Record) -> Vec<Option<Span>> {
        match self.text_regex(record.kind()) {
            Some(re) => qualifying_spans(record.primary_text(), re, self.spec.include_quoted)
                .map(Some)
                .collect(),
            None => vec![None],
        }
    }

    /// Re-derive the span for a retained reservoir entry. `None` means the match
    /// index no longer exists; `Some(None)` means no text regex applies.
    pub fn span_at(&self, record: &Record, match_index: usize) -> Option<Option<Span>> {
        match self.text_regex(record.kind()) {
            Some(re) => qualifying_spans(record.primary_text(), re, self.spec.include_quoted)
                .nth(match_index)
                .map(Some),
            None => (match_index == 0).then_some(None),
        }
    }

    /// Review reason for an admitted record, unless review checks are disabled.
    pub fn review(&self, record: &Record) -> Option<ReviewReason> {
        if self.spec.review_filters {
            review_reason(record, self.spec.popularity)
        } else {
            None
        }
    }
}
