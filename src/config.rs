use crate::date::YearMonth;
use crate::decoder::{DEFAULT_CHUNK_BYTES, DEFAULT_MAX_WINDOW_BYTES};
use crate::output::OutputFormat;
use std::fmt;
use std::path::{Path, PathBuf};

/// Data source toggle (comments, submissions, both).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sources {
    Comments,
    Submissions,
    Both,
}

/// Extract writes result/review files; Count only tallies relevant records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Extract,
    Count,
}

/// Sample size: a proportion of the month totals in the counts file, or a fixed K.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleMode {
    Proportion(f64),
    Fixed(usize),
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleMode::Proportion(p) => write!(f, "{p}"),
            SampleMode::Fixed(k) => write!(f, "{k}"),
        }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>, // required unless counting
    pub sources: Sources,
    pub start: Option<YearMonth>, // inclusive
    pub end: Option<YearMonth>,   // inclusive
    pub reverse_order: bool,
    pub format: OutputFormat,
    pub mode: RunMode,
    pub sample: Option<SampleMode>,
    pub sample_seed: Option<u64>,
    pub stats: bool,
    pub stats_per_month: bool,
    pub cleanup: bool, // merge per-month outputs at run end
    pub skip_corrupt_files: bool,
    pub progress: bool,
    pub progress_label: Option<String>,

    // decoder / IO tuning
    pub chunk_bytes: usize,
    pub max_window_bytes: u64,
    pub write_buffer_bytes: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: None,
            sources: Sources::Comments,
            start: None,
            end: None,
            reverse_order: false,
            format: OutputFormat::Csv,
            mode: RunMode::Extract,
            sample: None,
            sample_seed: None,
            stats: true,
            stats_per_month: false,
            cleanup: true,
            skip_corrupt_files: false,
            progress: true,
            progress_label: None,

            chunk_bytes: DEFAULT_CHUNK_BYTES,
            max_window_bytes: DEFAULT_MAX_WINDOW_BYTES,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl ExtractOptions {
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = Some(dir.as_ref().to_path_buf());
        self
    }
    pub fn with_sources(mut self, sources: Sources) -> Self {
        self.sources = sources;
        self
    }
    pub fn with_date_range(mut self, start: Option<YearMonth>, end: Option<YearMonth>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
    pub fn with_reverse_order(mut self, yes: bool) -> Self {
        self.reverse_order = yes;
        self
    }
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
    pub fn with_sample(mut self, sample: SampleMode) -> Self {
        self.sample = Some(sample);
        self
    }
    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }
    pub fn with_stats(mut self, yes: bool) -> Self {
        self.stats = yes;
        self
    }
    pub fn with_stats_per_month(mut self, yes: bool) -> Self {
        self.stats_per_month = yes;
        self
    }
    pub fn with_cleanup(mut self, yes: bool) -> Self {
        self.cleanup = yes;
        self
    }
    pub fn with_skip_corrupt_files(mut self, yes: bool) -> Self {
        self.skip_corrupt_files = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }

    // decoder tuning; tests use tiny chunks to force boundary splits
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }
    pub fn with_max_window_bytes(mut self, bytes: u64) -> Self {
        self.max_window_bytes = bytes;
        self
    }
    pub fn with_io_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
}
