use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rextract::{Extractor, ProcessTagger, SampleMode, Sources, YearMonth};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Src {
    User,
    Subreddit,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceSel {
    Comments,
    Submissions,
    Both,
}

/// Keyword and metadata search over the Pushshift Reddit monthly dumps.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory holding the RC_/RS_ monthly dumps
    #[arg(long, short = 'I')]
    input: PathBuf,
    /// Directory where results are written (required unless --count)
    #[arg(long, short = 'O')]
    output: Option<PathBuf>,

    /// First month to search, YYYY-MM (inclusive)
    #[arg(long, short = 'F')]
    time_from: Option<YearMonth>,
    /// Last month to search, YYYY-MM (inclusive)
    #[arg(long, short = 'T')]
    time_to: Option<YearMonth>,
    #[arg(long, value_enum, default_value = "comments")]
    sources: SourceSel,

    /// Whether --name lists users or subreddits
    #[arg(long, value_enum)]
    src: Option<Src>,
    /// User or subreddit name; repeatable
    #[arg(long, short = 'N')]
    name: Vec<String>,

    /// Regex (or path to a file holding one) for comment bodies
    #[arg(long)]
    comment_regex: Option<String>,
    /// Regex (or file) for submission selftext
    #[arg(long)]
    post_regex: Option<String>,
    #[arg(long)]
    title_regex: Option<String>,
    #[arg(long)]
    flair_regex: Option<String>,
    #[arg(long)]
    user_regex: Option<String>,
    #[arg(long)]
    case_sensitive: bool,

    /// Records scoring below this go to the review file
    #[arg(long, short = 'P')]
    popularity: Option<i64>,
    /// Only top-level comments (direct replies to a submission)
    #[arg(long)]
    toplevel: bool,

    /// TOKEN,TAG: keep records where TOKEN is tagged TAG
    #[arg(long)]
    tag_search: Option<String>,
    /// Tagger program run per record, e.g. "python3 tag.py en"
    #[arg(long)]
    tagger: Option<String>,

    /// Only count relevant records per month
    #[arg(long, short = 'C')]
    count: bool,
    /// Keep matches inside quoted lines
    #[arg(long)]
    include_quoted: bool,
    /// Sample this proportion (0..=1) of matches, sized by monthly-counts.txt
    #[arg(long, conflicts_with = "sample_size")]
    sample: Option<f64>,
    /// Sample exactly this many matches
    #[arg(long)]
    sample_size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,

    /// Write admitted records as raw JSON lines
    #[arg(long)]
    return_all: bool,
    /// Skip the review checks (score threshold, bot text)
    #[arg(long)]
    dont_filter: bool,
    #[arg(long)]
    reverse_order: bool,
    /// Keep per-month files instead of merging them
    #[arg(long)]
    no_cleanup: bool,
    #[arg(long)]
    no_stats: bool,
    #[arg(long)]
    stats_per_month: bool,
    /// Warn and continue past undecodable files
    #[arg(long)]
    skip_corrupt_files: bool,
    #[arg(long)]
    no_progress: bool,
}

/// A regex argument may name a file that holds the pattern.
fn regex_arg(value: Option<String>) -> Result<Option<String>> {
    let Some(v) = value else { return Ok(None) };
    let p = Path::new(&v);
    let pattern = if p.is_file() {
        fs::read_to_string(p).with_context(|| format!("read regex file {}", p.display()))?.trim_end_matches(['\n', '\r']).to_string()
    } else {
        v
    };
    if pattern.is_empty() {
        bail!("regex is empty; either the value was forgotten or the file is empty");
    }
    Ok(Some(pattern))
}

fn validate(cli: &Cli) -> Result<()> {
    if cli.output.is_none() && !cli.count {
        bail!("an output directory is required unless --count is given");
    }
    if !cli.input.is_dir() {
        bail!("input is not a directory: {}", cli.input.display());
    }
    let any_regex = cli.comment_regex.is_some()
        || cli.post_regex.is_some()
        || cli.title_regex.is_some()
        || cli.flair_regex.is_some()
        || cli.user_regex.is_some();
    if cli.time_from.is_none() && cli.time_to.is_none() && cli.src.is_none() && !any_regex {
        bail!("not enough search parameters; the search would return too many records");
    }
    match (cli.src.is_some(), cli.name.is_empty()) {
        (false, false) => bail!("--name requires --src"),
        (true, true) => bail!("--src requires --name"),
        _ => {}
    }
    if let (Some(from), Some(to)) = (cli.time_from, cli.time_to) {
        if from > to {
            bail!("--time-from is later than --time-to");
        }
    }
    if cli.tag_search.is_some() && cli.tagger.is_none() {
        bail!("--tag-search requires --tagger");
    }
    if let Some(p) = cli.sample {
        if !(0.0..=1.0).contains(&p) {
            bail!("sample proportion must be between 0.0 and 1.0");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    validate(&cli)?;
    rextract::init_tracing_once();

    let sources = match cli.sources {
        SourceSel::Comments => Sources::Comments,
        SourceSel::Submissions => Sources::Submissions,
        SourceSel::Both => Sources::Both,
    };
    if cli.time_from.is_none() && cli.time_to.is_none() {
        tracing::info!("No timeframe supplied. Searching all months found in the input directory.");
    }

    let mut ex = Extractor::new()
        .input_dir(&cli.input)
        .sources(sources)
        .date_range(cli.time_from, cli.time_to)
        .reverse_order(cli.reverse_order)
        .raw_json(cli.return_all)
        .stats(!cli.no_stats)
        .stats_per_month(cli.stats_per_month)
        .cleanup(!cli.no_cleanup)
        .skip_corrupt_files(cli.skip_corrupt_files)
        .progress(!cli.no_progress);
    if let Some(out) = &cli.output {
        ex = ex.output_dir(out);
    }
    if let Some(p) = cli.sample {
        ex = ex.sample(SampleMode::Proportion(p));
    }
    if let Some(k) = cli.sample_size {
        ex = ex.sample(SampleMode::Fixed(k));
    }
    if let Some(seed) = cli.seed {
        ex = ex.sample_seed(seed);
    }

    let mut plan = ex
        .search()
        .case_sensitive(cli.case_sensitive)
        .top_level_only(cli.toplevel)
        .include_quoted(cli.include_quoted)
        .review_filters(!cli.dont_filter);
    match cli.src {
        Some(Src::User) => plan = plan.authors(&cli.name),
        Some(Src::Subreddit) => plan = plan.subreddits(&cli.name),
        None => {}
    }
    if let Some(re) = regex_arg(cli.comment_regex)? {
        plan = plan.comment_regex(re);
    }
    if let Some(re) = regex_arg(cli.post_regex)? {
        plan = plan.post_regex(re);
    }
    if let Some(re) = regex_arg(cli.title_regex)? {
        plan = plan.title_regex(re);
    }
    if let Some(re) = regex_arg(cli.flair_regex)? {
        plan = plan.flair_regex(re);
    }
    if let Some(re) = regex_arg(cli.user_regex)? {
        plan = plan.author_regex(re);
    }
    if let Some(p) = cli.popularity {
        plan = plan.min_score(p);
    }
    if let Some(spec) = &cli.tag_search {
        let Some((token, tag)) = spec.split_once(',') else { bail!("--tag-search expects TOKEN,TAG") };
        plan = plan.tag_search(token.trim(), tag.trim());
    }
    if let Some(cmd) = &cli.tagger {
        plan = plan.tagger(ProcessTagger::from_command_line(cmd)?);
    }

    let summary = if cli.count { plan.count()? } else { plan.run()? };
    for path in summary.skipped_files() {
        eprintln!("skipped undecodable file: {}", path.display());
    }
    for path in &summary.outputs {
        eprintln!("wrote {}", path.display());
    }
    eprintln!("{} relevant records in {} files", summary.relevant, summary.months.len());
    Ok(())
}
