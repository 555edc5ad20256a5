#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Write a compressed `.zst` file containing the provided JSONL lines.
/// This mirrors the dumps' RC_/RS_ monthly files but with tiny content.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_xz_lines(path: &Path, lines: &[String]) {
    let f = File::create(path).unwrap();
    let mut enc = xz2::write::XzEncoder::new(f, 6);
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_bz2_lines(path: &Path, lines: &[String]) {
    let f = File::create(path).unwrap();
    let mut enc = bzip2::write::BzEncoder::new(f, bzip2::Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_plain_lines(path: &Path, lines: &[String]) {
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

pub fn zst_bytes(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 3).unwrap()
}

/// A comment record with the fields the pipeline reads.
pub fn comment(id: &str, author: &str, subreddit: &str, body: &str, score: i64, parent_id: &str) -> Value {
    json!({
        "id": id, "author": author, "subreddit": subreddit, "body": body,
        "score": score, "created_utc": 1136074600, "parent_id": parent_id,
        "link_id": "t3_s1", "author_flair_text": null, "controversiality": 0
    })
}

pub fn submission(id: &str, author: &str, subreddit: &str, title: &str, selftext: &str, score: i64) -> Value {
    json!({
        "id": id, "author": author, "subreddit": subreddit, "title": title,
        "selftext": selftext, "score": score, "created_utc": "1136073600",
        "permalink": format!("/r/{subreddit}/comments/{id}/x/"), "author_flair_text": "Mod"
    })
}

pub fn lines(values: &[Value]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Tiny input directory:
/// - RC_2006-01.zst: c1 alice (top-level, regex hit), c2 charlie (reply, regex hit),
///   c3 bot (top-level, "i'm a bot"), c4 dave (low score, hit), c1 again (duplicate)
/// - RC_2006-02.zst: c5 alice in r/rust (hit), plus a malformed line
/// - RS_2006-01.zst: s1 bob (selftext hit)
pub fn make_corpus_basic() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.into_path();

    let c1 = comment("c1", "alice", "programming", "I love Rust so much", 12, "t3_s1");
    let jan = vec![
        c1.clone(),
        comment("c2", "charlie", "programming", "&gt; I love Rust\n\nme too, Rust rocks", 7, "t1_c1"),
        comment("c3", "helperbot", "programming", "Rust link fixed. I'm a bot.", 20, "t3_s1"),
        comment("c4", "dave", "Programming", "rust is fine", 1, "t3_s1"),
        c1,
    ];
    write_zst_lines(&base.join("RC_2006-01.zst"), &lines(&jan));

    let mut feb = lines(&[comment("c5", "alice", "rust", "Rust again", 30, "t3_s9")]);
    feb.push("{not json".to_string());
    write_zst_lines(&base.join("RC_2006-02.zst"), &feb);

    let rs = vec![submission("s1", "bob", "programming", "Rust news", "What about Rust?", 183)];
    write_zst_lines(&base.join("RS_2006-01.zst"), &lines(&rs));

    base
}

pub fn write_counts(base: &Path, rows: &[(u16, u8, u64)]) {
    let mut f = File::create(base.join("monthly-counts.txt")).unwrap();
    for (y, m, n) in rows {
        writeln!(&mut f, "{y}\t{m:02}\t{n}").unwrap();
    }
}

/// Read a `;`-delimited CSV output into rows (header included).
pub fn read_csv_rows(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    rdr.records().map(|r| r.unwrap().iter().map(str::to_string).collect()).collect()
}

/// Read a JSONL file into a vector of `serde_json::Value` (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<Value> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

/// File names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

pub fn find_file(dir: &Path, pred: impl Fn(&str) -> bool) -> Option<PathBuf> {
    file_names(dir).into_iter().find(|n| pred(n)).map(|n| dir.join(n))
}
