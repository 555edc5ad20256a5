//! Result / review sinks. CSV rows are `;`-delimited with minimal quoting; raw
//! mode writes the original JSON line instead.

use crate::filters::ReviewReason;
use crate::record::Record;
use crate::spans::Span;
use crate::util::{create_with_backoff, remove_with_backoff};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RESULT_HEADER: [&str; 8] = ["text", "span", "subreddit", "score", "user", "flairtext", "date", "permalink"];
pub const REASON_COLUMN: &str = "filter reason";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One CSV row per match (or per record when no text regex is set).
    Csv,
    /// Admitted records verbatim, one JSON object per line.
    RawJsonl,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::RawJsonl => "jsonl",
        }
    }
}

/// Output projection of a record, optionally pinned to one match.
#[derive(Clone, Debug)]
pub struct ExtractionRow<'a> {
    pub text: &'a str,
    pub span: Option<Span>,
    pub subreddit: &'a str,
    pub score: i64,
    pub user: &'a str,
    pub flairtext: Option<&'a str>,
    pub date: i64,
    pub permalink: Option<String>,
    pub reason: Option<ReviewReason>,
}

impl<'a> ExtractionRow<'a> {
    pub fn new(record: &'a Record, span: Option<Span>, reason: Option<ReviewReason>) -> Self {
        Self {
            text: record.primary_text(),
            span,
            subreddit: &record.meta.subreddit,
            score: record.meta.score,
            user: &record.meta.author,
            flairtext: record.flair_text(),
            date: record.meta.created_utc,
            permalink: record.permalink_url(),
            reason,
        }
    }

    /// The eight result columns, plus the reason column when `with_reason`.
    pub fn fields(&self, with_reason: bool) -> Vec<String> {
        let mut v = vec![
            self.text.to_string(),
            self.span.map(|s| s.to_string()).unwrap_or_default(),
            self.subreddit.to_string(),
            self.score.to_string(),
            self.user.to_string(),
            self.flairtext.unwrap_or_default().to_string(),
            self.date.to_string(),
            self.permalink.clone().unwrap_or_default(),
        ];
        if with_reason {
            v.push(self.reason.map(|r| r.as_str().to_string()).unwrap_or_default());
        }
        v
    }
}

pub fn csv_writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .quote_style(csv::QuoteStyle::Necessary)
        .has_headers(false)
        .from_writer(w)
}

enum Inner {
    Csv(csv::Writer<BufWriter<File>>),
    Jsonl(BufWriter<File>),
}

/// One open output file (result or review). Flushed after every record so
/// results can be watched while a month is running.
pub struct RowSink {
    path: PathBuf,
    review: bool,
    inner: Inner,
    rows: u64,
}

impl RowSink {
    pub fn create(path: &Path, format: OutputFormat, review: bool, write_buf: usize) -> Result<Self> {
        let file = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
        let buf = BufWriter::with_capacity(write_buf.max(8 * 1024), file);
        let inner = match format {
            OutputFormat::Csv => {
                let mut w = csv_writer(buf);
                let mut header: Vec<&str> = RESULT_HEADER.to_vec();
                if review {
                    header.push(REASON_COLUMN);
                }
                w.write_record(&header)?;
                w.flush()?;
                Inner::Csv(w)
            }
            OutputFormat::RawJsonl => Inner::Jsonl(buf),
        };
        Ok(Self { path: path.to_path_buf(), review, inner, rows: 0 })
    }

    /// Write the rows for one record: one per span for CSV, the raw line once
    /// for JSONL.
    pub fn write_record(&mut self, record: &Record, spans: &[Option<Span>], reason: Option<ReviewReason>) -> Result<()> {
        match &mut self.inner {
            Inner::Csv(w) => {
                for span in spans {
                    let row = ExtractionRow::new(record, *span, reason);
                    w.write_record(row.fields(self.review))?;
                    self.rows += 1;
                }
                w.flush()?;
            }
            Inner::Jsonl(w) => {
                w.write_all(record.line().as_bytes())?;
                w.write_all(b"\n")?;
                w.flush()?;
                self.rows += 1;
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and close. An empty review file is removed; its path is then `None`.
    pub fn finish(self) -> Result<Option<PathBuf>> {
        match self.inner {
            Inner::Csv(mut w) => w.flush()?,
            Inner::Jsonl(mut w) => w.flush()?,
        }
        if self.review && self.rows == 0 {
            remove_with_backoff(&self.path, 16, 50)?;
            return Ok(None);
        }
        Ok(Some(self.path))
    }
}

/// What a closed `SinkPair` produced.
#[derive(Clone, Debug, Default)]
pub struct SinkOutcome {
    pub result: Option<PathBuf>,
    pub review: Option<PathBuf>,
    pub result_rows: u64,
    pub review_rows: u64,
}

/// Result and review files for one unit of output (a month, or the sample).
pub struct SinkPair {
    result: RowSink,
    review: RowSink,
}

impl SinkPair {
    pub fn create(result_path: &Path, review_path: &Path, format: OutputFormat, write_buf: usize) -> Result<Self> {
        Ok(Self {
            result: RowSink::create(result_path, format, false, write_buf)?,
            review: RowSink::create(review_path, format, true, write_buf)?,
        })
    }

    /// Route a record to the review file when it carries a reason, else to results.
    pub fn emit(&mut self, record: &Record, spans: &[Option<Span>], reason: Option<ReviewReason>) -> Result<()> {
        match reason {
            Some(_) => self.review.write_record(record, spans, reason),
            None => self.result.write_record(record, spans, None),
        }
    }

    pub fn finish(self) -> Result<SinkOutcome> {
        let result_rows = self.result.rows();
        let review_rows = self.review.rows();
        Ok(SinkOutcome {
            result: self.result.finish()?,
            review: self.review.finish()?,
            result_rows,
            review_rows,
        })
    }
}
