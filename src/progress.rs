//! Byte-based progress bar over the compressed size of the planned month files.

use crate::paths::MonthFile;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;

pub fn make_progress_bar_labeled(total_bytes: u64, label: Option<&str>) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
         {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    if let Some(msg) = label {
        pb.set_message(msg.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub fn total_compressed_size(files: &[MonthFile]) -> u64 {
    files
        .iter()
        .map(|f| fs::metadata(&f.path).map(|m| m.len()).unwrap_or(0))
        .sum()
}

/// Tracks the last decoder offset of the current file and feeds the deltas to the bar.
pub struct FileProgress<'a> {
    pb: Option<&'a ProgressBar>,
    last: u64,
}

impl<'a> FileProgress<'a> {
    pub fn new(pb: Option<&'a ProgressBar>) -> Self {
        Self { pb, last: 0 }
    }

    #[inline]
    pub fn advance_to(&mut self, offset: u64) {
        if let Some(pb) = self.pb {
            if offset > self.last {
                pb.inc(offset - self.last);
                self.last = offset;
            }
        }
    }
}
