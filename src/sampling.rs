//! Monthly record totals used to size a proportional sample.
//!
//! `monthly-counts.txt` lives in the input directory, one `year<TAB>month<TAB>count`
//! row per month.

use crate::date::YearMonth;
use crate::util::open_with_backoff;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

pub const COUNTS_FILE: &str = "monthly-counts.txt";

#[derive(Clone, Debug, Default)]
pub struct MonthlyCounts {
    counts: BTreeMap<YearMonth, u64>,
}

impl MonthlyCounts {
    pub fn load(input_dir: &Path) -> Result<Self> {
        let path = input_dir.join(COUNTS_FILE);
        let file = open_with_backoff(&path, 16, 50).with_context(|| format!("open counts file {}", path.display()))?;
        Self::parse(file).with_context(|| format!("parse counts file {}", path.display()))
    }

    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut counts = BTreeMap::new();
        for (i, row) in rdr.records().enumerate() {
            let row = row?;
            if row.iter().all(|f| f.is_empty()) {
                continue;
            }
            if row.len() < 3 {
                bail!("line {}: expected year, month and count", i + 1);
            }
            let year: u16 = row[0].parse().with_context(|| format!("line {}: bad year {:?}", i + 1, &row[0]))?;
            let month: u8 = row[1].parse().with_context(|| format!("line {}: bad month {:?}", i + 1, &row[1]))?;
            if !(1..=12).contains(&month) {
                bail!("line {}: month out of range: {month}", i + 1);
            }
            let count: u64 = row[2].parse().with_context(|| format!("line {}: bad count {:?}", i + 1, &row[2]))?;
            counts.insert(YearMonth { year, month }, count);
        }
        Ok(Self { counts })
    }

    pub fn get(&self, ym: YearMonth) -> Option<u64> {
        self.counts.get(&ym).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Reservoir size for proportion `p`: the sum of `round(p * count)` over the
/// distinct planned months. A month missing from `counts` is an error.
pub fn sample_size_for(counts: &MonthlyCounts, months: impl IntoIterator<Item = YearMonth>, p: f64) -> Result<usize> {
    let months: BTreeSet<YearMonth> = months.into_iter().collect();
    let mut k: u64 = 0;
    for ym in months {
        let n = counts.get(ym).ok_or_else(|| anyhow!("no record count for {ym} in {COUNTS_FILE}"))?;
        k += (p * n as f64).round() as u64;
    }
    Ok(k as usize)
}
