mod config;
mod date;
mod decoder;
mod paths;
mod query;
mod record;
mod spans;

mod filters;
mod progress;
mod stitch;
mod counting;
mod util;
mod pipeline;

mod dedupe;
mod json_utils;
mod output;
mod reservoir;
mod sampling;
mod state;
mod tagger;

pub use crate::config::{ExtractOptions, RunMode, SampleMode, Sources};
pub use crate::date::{iter_year_months, within_timeframe, YearMonth};
pub use crate::pipeline::{Extractor, MonthSummary, RunSummary, SearchPlan};
pub use crate::query::{allow_leading_quotes, normalize_name, SearchSpec, TagQuery};

// stream decoding and typed records
pub use crate::decoder::{open_lines, Compression, DecodeError, LineDecoder, DEFAULT_CHUNK_BYTES, DEFAULT_MAX_WINDOW_BYTES};
pub use crate::record::{Comment, Meta, Record, RecordKind, RecordSource, Submission, TextBearing};

// filter pipeline building blocks
pub use crate::filters::{review_reason, RelevanceFilter, ReviewReason};
pub use crate::spans::{find_all_spans, inside_quote, qualifying_spans, Span};
pub use crate::dedupe::{Fingerprint, FingerprintSet};
pub use crate::reservoir::{Reservoir, ReservoirEntry};
pub use crate::state::RunState;
pub use crate::counting::SubredditTally;
pub use crate::tagger::{ProcessTagger, TaggedToken, Tagger};

// outputs, naming and sampling denominators
pub use crate::output::{ExtractionRow, OutputFormat, RowSink, SinkOutcome, SinkPair, REASON_COLUMN, RESULT_HEADER};
pub use crate::paths::{base_name, discover_months, plan_months, sanitize_filename, Discovered, MonthFile, NameParts};
pub use crate::sampling::{sample_size_for, MonthlyCounts, COUNTS_FILE};
pub use crate::stitch::{concat_jsonl_parts, merge_csv_parts, MonthPart};

pub use crate::progress::make_progress_bar_labeled;
pub use crate::util::{create_with_backoff, init_tracing_once, open_with_backoff, remove_with_backoff};
