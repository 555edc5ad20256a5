//! Month file discovery/planning and output file naming.

use crate::config::Sources;
use crate::date::{iter_year_months, within_timeframe, YearMonth};
use crate::decoder::Compression;
use crate::record::RecordKind;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;
use walkdir::WalkDir;

/// One monthly dump, e.g. `RC_2010-03.zst`.
#[derive(Clone, Debug)]
pub struct MonthFile {
    pub kind: RecordKind,
    pub ym: YearMonth,
    pub path: PathBuf,
    pub compression: Compression,
}

impl MonthFile {
    pub fn prefix(&self) -> &'static str {
        match self.kind {
            RecordKind::Comment => "RC",
            RecordKind::Submission => "RS",
        }
    }
}

/// Discovered dumps keyed by month, one map per record kind.
#[derive(Clone, Debug, Default)]
pub struct Discovered {
    pub comments: BTreeMap<YearMonth, MonthFile>,
    pub submissions: BTreeMap<YearMonth, MonthFile>,
}

impl Discovered {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.submissions.is_empty()
    }
}

fn compression_rank(c: Compression) -> u8 {
    match c {
        Compression::None => 0,
        Compression::Zstd => 1,
        Compression::Xz => 2,
        Compression::Bzip2 => 3,
    }
}

/// Scan `dir` (depth 1) for `R[CS]_YYYY-MM[.zst|.xz|.bz2]`. When the same month
/// exists in several containers the plain file wins, then zst, xz, bz2.
pub fn discover_months(dir: &Path) -> Discovered {
    let re = Regex::new(r"^(RC|RS)_(\d{4})-(\d{2})(\.zst|\.xz|\.bz2)?$").unwrap();
    let mut found = Discovered::default();
    if !dir.exists() {
        return found;
    }
    for ent in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().flatten() {
        if !ent.file_type().is_file() {
            continue;
        }
        let Some(name) = ent.file_name().to_str() else { continue };
        let Some(caps) = re.captures(name) else { continue };
        let (Ok(year), Ok(month)) = (caps[2].parse::<u16>(), caps[3].parse::<u8>()) else { continue };
        if !(1..=12).contains(&month) {
            continue;
        }
        let (kind, map) = match &caps[1] {
            "RC" => (RecordKind::Comment, &mut found.comments),
            _ => (RecordKind::Submission, &mut found.submissions),
        };
        let path = ent.path().to_path_buf();
        let file = MonthFile { kind, ym: YearMonth { year, month }, compression: Compression::from_path(&path), path };
        let better = map
            .get(&file.ym)
            .map_or(true, |existing| compression_rank(file.compression) < compression_rank(existing.compression));
        if better {
            map.insert(file.ym, file);
        }
    }
    found
}

/// Months inside the timeframe for the selected sources, chronological with
/// comments before submissions of the same month (or fully reversed).
/// Months absent from the input directory are skipped silently.
pub fn plan_months(
    discovered: &Discovered,
    sources: Sources,
    start: Option<YearMonth>,
    end: Option<YearMonth>,
    reverse: bool,
) -> Vec<MonthFile> {
    let maps: Vec<&BTreeMap<YearMonth, MonthFile>> = match sources {
        Sources::Comments => vec![&discovered.comments],
        Sources::Submissions => vec![&discovered.submissions],
        Sources::Both => vec![&discovered.comments, &discovered.submissions],
    };
    let lo = maps.iter().filter_map(|m| m.keys().next().copied()).min();
    let hi = maps.iter().filter_map(|m| m.keys().next_back().copied()).max();
    let (Some(lo), Some(hi)) = (lo, hi) else { return Vec::new() };

    let mut plan = Vec::new();
    for ym in iter_year_months(lo, hi).filter(|ym| within_timeframe(*ym, start, end)) {
        for map in &maps {
            if let Some(f) = map.get(&ym) {
                plan.push(f.clone());
            }
        }
    }
    if reverse {
        plan.reverse();
    }
    plan
}

// -------- output naming --------

/// Parts of the search that show up in output file names.
#[derive(Clone, Debug, Default)]
pub struct NameParts {
    pub sources: Option<Sources>,
    /// `("subreddit" | "user", names)`
    pub names: Option<(String, Vec<String>)>,
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
    pub popularity: Option<i64>,
    pub toplevel: bool,
    pub sample: Option<String>,
}

pub const REVIEW_SUFFIX: &str = "_filtered-out_matches";

/// Replace characters that are illegal in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_end_matches(['.', ' '])
        .to_string()
}

fn executed_at(now: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day]_at_[hour]h-[minute]m-[second]s");
    now.format(fmt).unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Base name shared by every output file of one run (no month, no extension).
pub fn base_name(parts: &NameParts, now: OffsetDateTime) -> String {
    let mut name = match parts.sources {
        Some(Sources::Comments) => "comment_extraction".to_string(),
        Some(Sources::Submissions) => "submission_extraction".to_string(),
        _ => "extraction".to_string(),
    };
    if let Some((src, names)) = &parts.names {
        let shown: Vec<&str> = names.iter().take(5).map(String::as_str).collect();
        name.push_str(&format!("_from_{src}_{}", shown.join(";")));
    }
    if let Some(from) = parts.from {
        name.push_str(&format!("_from_{}-{}", from.year, from.month));
    }
    if let Some(to) = parts.to {
        name.push_str(&format!("_up_to_{}-{}", to.year, to.month));
    }
    if let Some(p) = parts.popularity {
        name.push_str(&format!("_score_over_{p}"));
    }
    if parts.toplevel {
        name.push_str("_toplevel-only");
    }
    if let Some(s) = &parts.sample {
        name.push_str(&format!("_sample-{s}"));
    }
    name.push_str("_executed-at_");
    name.push_str(&executed_at(now));
    sanitize_filename(&name)
}

/// `{base}_{YYYY-MM}[_RC|_RS].{ext}`; the kind tag only when both sources run.
pub fn month_file_name(base: &str, file: &MonthFile, tag_kind: bool, ext: &str) -> String {
    if tag_kind {
        format!("{base}_{}_{}.{ext}", file.ym, file.prefix())
    } else {
        format!("{base}_{}.{ext}", file.ym)
    }
}

/// Review counterpart of a result file name.
pub fn review_file_name(result_name: &str) -> String {
    match result_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}{REVIEW_SUFFIX}.{ext}"),
        None => format!("{result_name}{REVIEW_SUFFIX}"),
    }
}

pub fn sample_file_name(base: &str, ext: &str) -> String {
    format!("{base}_sample.{ext}")
}

pub fn merged_file_name(base: &str, ext: &str) -> String {
    format!("{base}.{ext}")
}

pub const STATS_FILE: &str = "search_stats.json";

pub fn month_stats_file_name(file: &MonthFile, tag_kind: bool) -> String {
    if tag_kind {
        format!("search_stats_{}_{}.json", file.ym, file.prefix())
    } else {
        format!("search_stats_{}.json", file.ym)
    }
}
