//! Output stitching: merge per-month CSV parts into one file with leading
//! `type;year;month` columns, or concatenate JSONL parts.

use crate::date::YearMonth;
use crate::output::{csv_writer, REASON_COLUMN, RESULT_HEADER};
use crate::record::RecordKind;
use crate::util::{create_with_backoff, open_with_backoff, remove_with_backoff};
use anyhow::{Context, Result};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A finished per-month output file and what it holds.
#[derive(Clone, Debug)]
pub struct MonthPart {
    pub kind: RecordKind,
    pub ym: YearMonth,
    pub path: PathBuf,
}

/// Merge CSV parts (each with its own header) into `out_path`, prefixing each
/// row with the record kind, year and month. Parts are removed afterwards.
pub fn merge_csv_parts(parts: &[MonthPart], out_path: &Path, with_reason: bool, write_buf: usize) -> Result<u64> {
    let file = create_with_backoff(out_path, 16, 50).with_context(|| format!("create {}", out_path.display()))?;
    let mut out = csv_writer(BufWriter::with_capacity(write_buf, file));
    let mut header = vec!["type", "year", "month"];
    header.extend(RESULT_HEADER);
    if with_reason {
        header.push(REASON_COLUMN);
    }
    out.write_record(&header)?;

    let mut rows = 0u64;
    for part in parts {
        let f = open_with_backoff(&part.path, 16, 50).with_context(|| format!("open {}", part.path.display()))?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(f));
        let year = part.ym.year.to_string();
        let month = format!("{:02}", part.ym.month);
        for rec in rdr.records() {
            let rec = rec.with_context(|| format!("read {}", part.path.display()))?;
            let mut row: Vec<&str> = vec![part.kind.label(), year.as_str(), month.as_str()];
            row.extend(rec.iter());
            out.write_record(&row)?;
            rows += 1;
        }
    }
    out.flush()?;
    drop(out);
    remove_parts(parts)?;
    Ok(rows)
}

/// Concatenate JSONL parts in order into `out_path`, then remove them.
pub fn concat_jsonl_parts(parts: &[MonthPart], out_path: &Path, write_buf: usize) -> Result<()> {
    let file = create_with_backoff(out_path, 16, 50).with_context(|| format!("create {}", out_path.display()))?;
    let mut out = BufWriter::with_capacity(write_buf, file);
    for part in parts {
        let mut r = BufReader::new(open_with_backoff(&part.path, 16, 50)?);
        std::io::copy(&mut r, &mut out)?;
    }
    out.flush()?;
    drop(out);
    remove_parts(parts)
}

fn remove_parts(parts: &[MonthPart]) -> Result<()> {
    for part in parts {
        remove_with_backoff(&part.path, 16, 50)?;
    }
    Ok(())
}
