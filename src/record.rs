//! Typed Reddit records and the record source that feeds the filter pipeline.

use crate::decoder::LineDecoder;
use crate::json_utils::{int_or_string, is_comment_record, is_submission_record};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Fields shared by comments and submissions.
#[derive(Clone, Debug, Deserialize)]
pub struct Meta {
    pub id: String,
    pub author: String,
    pub subreddit: String,
    #[serde(deserialize_with = "int_or_string")]
    pub score: i64,
    #[serde(deserialize_with = "int_or_string")]
    pub created_utc: i64,
    #[serde(default)]
    pub author_flair_text: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Comment {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub link_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub selftext: String,
    pub title: String,
}

/// The text-carrying part of a record; comments and submissions keep their
/// main text under different field names.
#[derive(Clone, Debug)]
pub enum TextBearing {
    Comment(Comment),
    Submission(Submission),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Comment,
    Submission,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Comment => "comment",
            RecordKind::Submission => "submission",
        }
    }
}

/// One parsed line of a monthly dump.
#[derive(Clone, Debug)]
pub struct Record {
    pub meta: Meta,
    pub content: TextBearing,
    line: String,
}

impl Record {
    /// Parse a JSON line. Unknown shapes (neither `body` nor `title`) and missing
    /// required fields are errors.
    pub fn parse(line: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(line)?;
        if !raw.is_object() {
            return Err(anyhow!("not a JSON object"));
        }
        let meta = Meta::deserialize(&raw)?;
        let content = if is_comment_record(&raw) {
            TextBearing::Comment(Comment::deserialize(&raw)?)
        } else if is_submission_record(&raw) {
            TextBearing::Submission(Submission::deserialize(&raw)?)
        } else {
            return Err(anyhow!("unknown record shape (neither `body` nor `title`)"));
        };
        Ok(Self { meta, content, line: line.to_string() })
    }

    pub fn kind(&self) -> RecordKind {
        match self.content {
            TextBearing::Comment(_) => RecordKind::Comment,
            TextBearing::Submission(_) => RecordKind::Submission,
        }
    }

    /// Comment body or submission selftext.
    pub fn primary_text(&self) -> &str {
        match &self.content {
            TextBearing::Comment(c) => &c.body,
            TextBearing::Submission(s) => &s.selftext,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match &self.content {
            TextBearing::Comment(_) => None,
            TextBearing::Submission(s) => Some(&s.title),
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match &self.content {
            TextBearing::Comment(c) => c.parent_id.as_deref(),
            TextBearing::Submission(_) => None,
        }
    }

    pub fn flair_text(&self) -> Option<&str> {
        self.meta.author_flair_text.as_deref()
    }

    /// Link to the record on reddit.com. Prefers the `permalink` field; older
    /// comments are rebuilt from `link_id` + `id`.
    pub fn permalink_url(&self) -> Option<String> {
        if let Some(p) = self.meta.permalink.as_deref() {
            return Some(format!("https://www.reddit.com{p}"));
        }
        let base = format!("https://www.reddit.com/r/{}/comments/", self.meta.subreddit);
        match &self.content {
            TextBearing::Comment(c) => {
                let link = c.link_id.as_deref()?;
                let link = link.split_once('_').map(|(_, rest)| rest).unwrap_or(link);
                Some(format!("{base}{link}//{}", self.meta.id))
            }
            TextBearing::Submission(_) => Some(format!("{base}{}", self.meta.id)),
        }
    }

    /// The line exactly as read from the dump.
    pub fn line(&self) -> &str {
        &self.line
    }
}

/// Wraps a `LineDecoder`, parsing each line into a `Record`.
///
/// Malformed lines are logged and skipped; decoder errors are passed through and
/// end the iteration.
pub struct RecordSource<'a> {
    lines: LineDecoder<'a>,
    label: String,
    line_no: u64,
    skipped: u64,
}

impl<'a> RecordSource<'a> {
    pub fn new(lines: LineDecoder<'a>, label: impl Into<String>) -> Self {
        Self { lines, label: label.into(), line_no: 0, skipped: 0 }
    }

    pub fn from_path(path: &Path, lines: LineDecoder<'a>) -> Self {
        Self::new(lines, path.display().to_string())
    }

    /// Number of non-empty lines skipped because they failed to parse.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn offset(&self) -> u64 {
        self.lines.offset()
    }
}

impl Iterator for RecordSource<'_> {
    type Item = Result<(Record, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line, offset) = match self.lines.next()? {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match Record::parse(&line) {
                Ok(rec) => return Some(Ok((rec, offset))),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(file = %self.label, line = self.line_no, error = %e, "Skipping malformed line");
                }
            }
        }
    }
}
