//! Per-subreddit tally of admitted records, with JSON output.

use crate::util::create_with_backoff;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct SubredditTally {
    counts: BTreeMap<String, u64>,
}

impl SubredditTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, subreddit: &str) {
        *self.counts.entry(subreddit.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, subreddit: &str) -> u64 {
        self.counts.get(subreddit).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Write the tally as a single JSON object `{subreddit: count}`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = create_with_backoff(path, 16, 50).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer(&mut w, self)?;
        w.flush()?;
        Ok(())
    }
}
