use crate::config::{ExtractOptions, RunMode, SampleMode, Sources};
use crate::counting::SubredditTally;
use crate::date::YearMonth;
use crate::decoder::{open_lines, warn_decode_skip, DecodeError};
use crate::filters::RelevanceFilter;
use crate::output::{OutputFormat, SinkOutcome, SinkPair};
use crate::paths::{
    base_name, discover_months, merged_file_name, month_file_name, month_stats_file_name, plan_months,
    review_file_name, sample_file_name, MonthFile, NameParts, STATS_FILE,
};
use crate::progress::{make_progress_bar_labeled, total_compressed_size, FileProgress};
use crate::query::{SearchSpec, TagQuery};
use crate::record::{Record, RecordSource};
use crate::reservoir::Reservoir;
use crate::sampling::{sample_size_for, MonthlyCounts};
use crate::state::RunState;
use crate::stitch::{concat_jsonl_parts, merge_csv_parts, MonthPart};
use crate::tagger::Tagger;
use crate::util::init_tracing_once;
use anyhow::{anyhow, bail, Context, Result};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

#[derive(Clone, Default)]
pub struct Extractor {
    pub(crate) opts: ExtractOptions,
}

impl Extractor {
    pub fn new() -> Self {
        Self { opts: ExtractOptions::default() }
    }

    pub fn from_options(opts: ExtractOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input_dir(dir); self }
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_dir(dir); self }
    pub fn sources(mut self, sources: Sources) -> Self { self.opts = self.opts.with_sources(sources); self }
    pub fn date_range(mut self, start: Option<YearMonth>, end: Option<YearMonth>) -> Self { self.opts = self.opts.with_date_range(start, end); self }
    pub fn reverse_order(mut self, yes: bool) -> Self { self.opts = self.opts.with_reverse_order(yes); self }
    pub fn format(mut self, format: OutputFormat) -> Self { self.opts = self.opts.with_format(format); self }
    pub fn raw_json(self, yes: bool) -> Self { self.format(if yes { OutputFormat::RawJsonl } else { OutputFormat::Csv }) }
    pub fn sample(mut self, sample: SampleMode) -> Self { self.opts = self.opts.with_sample(sample); self }
    pub fn sample_seed(mut self, seed: u64) -> Self { self.opts = self.opts.with_sample_seed(seed); self }
    pub fn stats(mut self, yes: bool) -> Self { self.opts = self.opts.with_stats(yes); self }
    pub fn stats_per_month(mut self, yes: bool) -> Self { self.opts = self.opts.with_stats_per_month(yes); self }
    pub fn cleanup(mut self, yes: bool) -> Self { self.opts = self.opts.with_cleanup(yes); self }
    pub fn skip_corrupt_files(mut self, yes: bool) -> Self { self.opts = self.opts.with_skip_corrupt_files(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn chunk_bytes(mut self, bytes: usize) -> Self { self.opts = self.opts.with_chunk_bytes(bytes); self }
    pub fn max_window_bytes(mut self, bytes: u64) -> Self { self.opts = self.opts.with_max_window_bytes(bytes); self }
    pub fn io_write_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_write_buffer(bytes); self }

    // -------- enter search mode --------
    pub fn search(self) -> SearchPlan {
        SearchPlan { ex: self, spec: SearchSpec::default(), tagger: None }
    }
}

// ----------------- SearchPlan -----------------

pub struct SearchPlan {
    ex: Extractor,
    spec: SearchSpec,
    tagger: Option<Box<dyn Tagger>>,
}

impl SearchPlan {
    pub fn subreddit(self, s: impl AsRef<str>) -> Self { self.subreddits([s]) }
    pub fn subreddits<I, S>(mut self, iter: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
        self.spec.subreddits = Some(iter.into_iter().map(|s| s.as_ref().to_string()).collect()); self
    }
    pub fn author(self, a: impl AsRef<str>) -> Self { self.authors([a]) }
    pub fn authors<I, S>(mut self, iter: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
        self.spec.authors = Some(iter.into_iter().map(|s| s.as_ref().to_string()).collect()); self
    }
    pub fn top_level_only(mut self, yes: bool) -> Self { self.spec.top_level_only = yes; self }
    pub fn comment_regex(mut self, re: impl Into<String>) -> Self { self.spec.comment_regex = Some(re.into()); self }
    pub fn post_regex(mut self, re: impl Into<String>) -> Self { self.spec.post_regex = Some(re.into()); self }
    pub fn title_regex(mut self, re: impl Into<String>) -> Self { self.spec.title_regex = Some(re.into()); self }
    pub fn flair_regex(mut self, re: impl Into<String>) -> Self { self.spec.flair_regex = Some(re.into()); self }
    pub fn author_regex(mut self, re: impl Into<String>) -> Self { self.spec.author_regex = Some(re.into()); self }
    pub fn case_sensitive(mut self, yes: bool) -> Self { self.spec.case_sensitive = yes; self }
    pub fn include_quoted(mut self, yes: bool) -> Self { self.spec.include_quoted = yes; self }
    pub fn min_score(mut self, v: i64) -> Self { self.spec.popularity = Some(v); self }
    pub fn review_filters(mut self, yes: bool) -> Self { self.spec.review_filters = yes; self }
    pub fn tag_search(mut self, token: impl Into<String>, tag: impl Into<String>) -> Self {
        self.spec.tag = Some(TagQuery { token: token.into(), tag: tag.into() }); self
    }
    pub fn tagger(mut self, tagger: impl Tagger + 'static) -> Self { self.tagger = Some(Box::new(tagger)); self }

    pub fn spec(&self) -> &SearchSpec {
        &self.spec
    }

    /// Extract matches into result/review files (or a sample).
    pub fn run(mut self) -> Result<RunSummary> {
        self.ex.opts.mode = RunMode::Extract;
        execute(self.ex.opts, self.spec, self.tagger)
    }

    /// Only count relevant records per month; writes stats when an output dir is set.
    pub fn count(mut self) -> Result<RunSummary> {
        self.ex.opts.mode = RunMode::Count;
        execute(self.ex.opts, self.spec, self.tagger)
    }
}

/// Per-month outcome.
#[derive(Clone, Debug)]
pub struct MonthSummary {
    pub file: MonthFile,
    pub relevant: u64,
    pub result_rows: u64,
    pub review_rows: u64,
    /// The file was abandoned after a decode error.
    pub skipped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub base_name: String,
    pub months: Vec<MonthSummary>,
    pub relevant: u64,
    pub sample_size: Option<usize>,
    /// Files left on disk at run end (merged outputs, or month parts without cleanup).
    pub outputs: Vec<PathBuf>,
    pub stats: SubredditTally,
}

impl RunSummary {
    pub fn skipped_files(&self) -> impl Iterator<Item = &Path> {
        self.months.iter().filter(|m| m.skipped).map(|m| m.file.path.as_path())
    }
}

struct Run {
    opts: ExtractOptions,
    filter: RelevanceFilter,
    state: RunState,
    pb: Option<ProgressBar>,
    base: String,
    out_dir: Option<PathBuf>,
    tag_kind: bool,
}

fn execute(opts: ExtractOptions, spec: SearchSpec, tagger: Option<Box<dyn Tagger>>) -> Result<RunSummary> {
    init_tracing_once();

    if spec.tag.is_some() && tagger.is_none() {
        bail!("a tag search requires a tagger");
    }
    let mut filter = RelevanceFilter::new(spec)?;
    if let Some(t) = tagger {
        filter = filter.with_tagger(t);
    }

    let extracting = opts.mode == RunMode::Extract;
    let out_dir = opts.output_dir.clone();
    if extracting && out_dir.is_none() {
        bail!("an output directory is required unless counting");
    }
    if let Some(dir) = &out_dir {
        fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
    }

    let discovered = discover_months(&opts.input_dir);
    let plan = plan_months(&discovered, opts.sources, opts.start, opts.end, opts.reverse_order);
    if discovered.is_empty() {
        tracing::warn!(input = %opts.input_dir.display(), "No RC_/RS_ dump files in input dir.");
    } else if plan.is_empty() {
        tracing::warn!(input = %opts.input_dir.display(), "No month files found matching selection. Check input dir and timeframe.");
    } else {
        tracing::info!("Searching from {} to {} ({} files)", plan[0].ym, plan[plan.len() - 1].ym, plan.len());
    }

    // Sample size is fixed before any record is read.
    let sample_size = match (extracting, opts.sample) {
        (true, Some(SampleMode::Fixed(k))) => Some(k),
        (true, Some(SampleMode::Proportion(p))) => {
            if !(0.0..=1.0).contains(&p) {
                bail!("sample proportion must be within [0, 1], got {p}");
            }
            let counts = MonthlyCounts::load(&opts.input_dir)?;
            Some(sample_size_for(&counts, plan.iter().map(|f| f.ym), p)?)
        }
        _ => None,
    };
    if let Some(k) = sample_size {
        tracing::info!(k, "Sampling {k} matches over the timeframe");
    }

    let track_stats = opts.stats || !extracting;
    let mut state = RunState::new(track_stats);
    if let Some(k) = sample_size {
        let reservoir = match opts.sample_seed {
            Some(seed) => Reservoir::seeded(k, seed),
            None => Reservoir::new(k),
        };
        state = state.with_reservoir(reservoir);
    }

    let names = {
        let s = filter.spec();
        match (&s.subreddits, &s.authors) {
            (Some(subs), _) => Some(("subreddit".to_string(), subs.clone())),
            (None, Some(authors)) => Some(("user".to_string(), authors.clone())),
            _ => None,
        }
    };
    let parts = NameParts {
        sources: Some(opts.sources),
        names,
        from: opts.start,
        to: opts.end,
        popularity: filter.spec().popularity,
        toplevel: filter.spec().top_level_only,
        sample: opts.sample.map(|s| s.to_string()),
    };
    let base = base_name(&parts, OffsetDateTime::now_utc());

    let pb = opts
        .progress
        .then(|| make_progress_bar_labeled(total_compressed_size(&plan), opts.progress_label.as_deref()));

    let mut run = Run {
        tag_kind: opts.sources == Sources::Both,
        opts,
        filter,
        state,
        pb,
        base,
        out_dir,
    };
    let summary = run.execute_plan(&plan, sample_size);
    if let Some(pb) = &run.pb {
        pb.finish_with_message("done");
    }
    summary
}

impl Run {
    fn extracting(&self) -> bool {
        self.opts.mode == RunMode::Extract
    }

    fn execute_plan(&mut self, plan: &[MonthFile], sample_size: Option<usize>) -> Result<RunSummary> {
        let mut months = Vec::with_capacity(plan.len());
        let mut result_parts = Vec::new();
        let mut review_parts = Vec::new();

        for file in plan {
            let (summary, outcome) = self.process_month(file)?;
            if !self.extracting() {
                tracing::info!("{} instances for {}", summary.relevant, file.ym);
            }
            if let Some(outcome) = outcome {
                if let Some(path) = outcome.result {
                    result_parts.push(MonthPart { kind: file.kind, ym: file.ym, path });
                }
                if let Some(path) = outcome.review {
                    review_parts.push(MonthPart { kind: file.kind, ym: file.ym, path });
                }
            }
            self.write_month_stats(file)?;
            months.push(summary);
        }

        let relevant: u64 = months.iter().map(|m| m.relevant).sum();
        if !self.extracting() {
            tracing::info!("{relevant} total instances");
        }

        let mut outputs = Vec::new();
        if let Some(reservoir) = self.state.take_reservoir() {
            outputs.extend(self.flush_reservoir(reservoir)?);
        } else if self.extracting() {
            if self.opts.cleanup {
                outputs.extend(self.merge(&result_parts, false)?);
                outputs.extend(self.merge(&review_parts, true)?);
            } else {
                outputs.extend(result_parts.into_iter().chain(review_parts).map(|p| p.path));
            }
        }

        if self.opts.stats {
            if let Some(dir) = &self.out_dir {
                self.state.tally().write_json(&dir.join(STATS_FILE))?;
            }
        }

        Ok(RunSummary {
            base_name: self.base.clone(),
            months,
            relevant,
            sample_size,
            outputs,
            stats: self.state.tally().clone(),
        })
    }

    fn month_sinks(&self, file: &MonthFile) -> Result<Option<SinkPair>> {
        if !self.extracting() || self.state.is_sampling() {
            return Ok(None);
        }
        let dir = self.out_dir.as_ref().ok_or_else(|| anyhow!("output directory missing"))?;
        let name = month_file_name(&self.base, file, self.tag_kind, self.opts.format.extension());
        let result = dir.join(&name);
        let review = dir.join(review_file_name(&name));
        Ok(Some(SinkPair::create(&result, &review, self.opts.format, self.opts.write_buffer_bytes)?))
    }

    fn process_month(&mut self, file: &MonthFile) -> Result<(MonthSummary, Option<SinkOutcome>)> {
        tracing::info!("Processing {}", file.ym.long_name());
        let lines = open_lines(&file.path, self.opts.chunk_bytes, self.opts.max_window_bytes)?;
        let mut source = RecordSource::from_path(&file.path, lines);
        let mut sinks = self.month_sinks(file)?;
        let count_only = !self.extracting();
        let mut progress = FileProgress::new(self.pb.as_ref());

        let drained = drain(
            &mut source,
            &mut self.filter,
            &mut self.state,
            sinks.as_mut(),
            &mut progress,
            count_only,
        );
        // Close the month's files before acting on any error.
        let outcome = sinks.map(SinkPair::finish).transpose()?;
        let (relevant, decode_err) = drained.with_context(|| format!("processing {}", file.path.display()))?;

        if source.skipped() > 0 {
            tracing::info!(file = %file.path.display(), skipped = source.skipped(), "Malformed lines skipped");
        }

        let mut skipped = false;
        if let Some(e) = decode_err {
            if self.opts.skip_corrupt_files {
                warn_decode_skip(&file.path, &e);
                skipped = true;
            } else if e.downcast_ref::<DecodeError>().is_some() {
                return Err(e.context(format!("undecodable file {}", file.path.display())));
            } else {
                return Err(e.context(format!("reading {}", file.path.display())));
            }
        }

        let (result_rows, review_rows) = outcome.as_ref().map_or((0, 0), |o| (o.result_rows, o.review_rows));
        Ok((MonthSummary { file: file.clone(), relevant, result_rows, review_rows, skipped }, outcome))
    }

    fn write_month_stats(&self, file: &MonthFile) -> Result<()> {
        let wanted = (self.opts.stats && self.opts.stats_per_month) || !self.extracting();
        if !wanted {
            return Ok(());
        }
        if let Some(dir) = &self.out_dir {
            self.state.tally().write_json(&dir.join(month_stats_file_name(file, self.tag_kind)))?;
        }
        Ok(())
    }

    /// Re-derive spans for the retained entries and write them in stream order.
    fn flush_reservoir(&self, reservoir: Reservoir<Record>) -> Result<Vec<PathBuf>> {
        let dir = self.out_dir.as_ref().ok_or_else(|| anyhow!("output directory missing"))?;
        let offered = reservoir.offered();
        let capacity = reservoir.capacity();
        let name = sample_file_name(&self.base, self.opts.format.extension());
        let mut sinks = SinkPair::create(
            &dir.join(&name),
            &dir.join(review_file_name(&name)),
            self.opts.format,
            self.opts.write_buffer_bytes,
        )?;
        let mut kept = 0usize;
        for entry in reservoir.drain_in_stream_order() {
            let record = entry.item.as_ref();
            let Some(span) = self.filter.span_at(record, entry.match_index) else {
                tracing::warn!(id = %record.meta.id, match_index = entry.match_index, "Sampled match no longer found; row omitted");
                continue;
            };
            let reason = self.filter.review(record);
            sinks.emit(record, &[span], reason)?;
            kept += 1;
        }
        let outcome = sinks.finish()?;
        tracing::info!(offered, capacity, kept, "Sample written");
        Ok(outcome.result.into_iter().chain(outcome.review).collect())
    }

    fn merge(&self, parts: &[MonthPart], review: bool) -> Result<Option<PathBuf>> {
        if parts.is_empty() {
            return Ok(None);
        }
        let dir = self.out_dir.as_ref().ok_or_else(|| anyhow!("output directory missing"))?;
        let ext = self.opts.format.extension();
        let name = merged_file_name(&self.base, ext);
        let out = dir.join(if review { review_file_name(&name) } else { name });
        match self.opts.format {
            OutputFormat::Csv => {
                let rows = merge_csv_parts(parts, &out, review, self.opts.write_buffer_bytes)?;
                tracing::info!(path = %out.display(), rows, "Merged monthly outputs");
            }
            OutputFormat::RawJsonl => {
                concat_jsonl_parts(parts, &out, self.opts.write_buffer_bytes)?;
                tracing::info!(path = %out.display(), "Merged monthly outputs");
            }
        }
        Ok(Some(out))
    }
}

/// Run every record of one file through the filter. Returns the relevant count
/// and, separately, a read/decode error that ended the file early; other
/// errors (writes, tagging) are returned as `Err`.
fn drain(
    source: &mut RecordSource<'_>,
    filter: &mut RelevanceFilter,
    state: &mut RunState,
    mut sinks: Option<&mut SinkPair>,
    progress: &mut FileProgress<'_>,
    count_only: bool,
) -> Result<(u64, Option<anyhow::Error>)> {
    let mut relevant = 0u64;
    for item in source.by_ref() {
        let (record, offset) = match item {
            Ok(v) => v,
            Err(e) => return Ok((relevant, Some(e))),
        };
        progress.advance_to(offset);
        if !filter.check(&record, state)? {
            continue;
        }
        relevant += 1;
        if count_only {
            continue;
        }
        if state.is_sampling() {
            let weight = filter.weight(&record);
            state.offer(record, weight);
            continue;
        }
        if let Some(s) = sinks.as_deref_mut() {
            let reason = filter.review(&record);
            let spans = filter.row_spans(&record);
            s.emit(&record, &spans, reason)?;
        }
    }
    progress.advance_to(source.offset());
    Ok((relevant, None))
}
