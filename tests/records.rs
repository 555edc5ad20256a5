#[path = "common/mod.rs"]
mod common;

use common::*;
use rextract::{Compression, Fingerprint, LineDecoder, Record, RecordKind, RecordSource};
use serde_json::json;
use std::io::Cursor;

fn source(lines: &[String]) -> RecordSource<'static> {
    let text = lines.join("\n");
    let dec = LineDecoder::new(Cursor::new(text.into_bytes()), Compression::None).unwrap();
    RecordSource::new(dec, "test")
}

#[test]
fn parses_comments_and_submissions() {
    let c = Record::parse(&comment("c1", "alice", "rust", "hello", 3, "t3_x").to_string()).unwrap();
    assert_eq!(c.kind(), RecordKind::Comment);
    assert_eq!(c.primary_text(), "hello");
    assert_eq!(c.title(), None);
    assert_eq!(c.parent_id(), Some("t3_x"));

    // created_utc as a numeric string (older dumps)
    let s = Record::parse(&submission("s1", "bob", "rust", "Title", "body text", 5).to_string()).unwrap();
    assert_eq!(s.kind(), RecordKind::Submission);
    assert_eq!(s.primary_text(), "body text");
    assert_eq!(s.title(), Some("Title"));
    assert_eq!(s.meta.created_utc, 1136073600);
}

#[test]
fn submission_without_selftext_defaults_to_empty() {
    let line = json!({"id":"s2","author":"a","subreddit":"r","title":"t","score":1,"created_utc":1}).to_string();
    let s = Record::parse(&line).unwrap();
    assert_eq!(s.primary_text(), "");
}

#[test]
fn permalink_prefers_field_then_rebuilds() {
    let s = Record::parse(&submission("s1", "bob", "rust", "T", "", 1).to_string()).unwrap();
    assert_eq!(s.permalink_url().as_deref(), Some("https://www.reddit.com/r/rust/comments/s1/x/"));

    let c = Record::parse(&comment("c9", "a", "rust", "x", 1, "t3_s1").to_string()).unwrap();
    assert_eq!(c.permalink_url().as_deref(), Some("https://www.reddit.com/r/rust/comments/s1//c9"));
}

#[test]
fn unknown_shapes_and_missing_fields_are_rejected() {
    assert!(Record::parse(r#"{"id":"x","author":"a","subreddit":"r","score":1,"created_utc":1}"#).is_err());
    assert!(Record::parse(r#"{"body":"no meta"}"#).is_err());
    assert!(Record::parse("[1,2,3]").is_err());
}

#[test]
fn source_skips_malformed_and_empty_lines() {
    let mut rows = lines(&[comment("c1", "a", "r", "one", 1, "t3_x")]);
    rows.push(String::new());
    rows.push("{broken".to_string());
    rows.push(json!({"id":"x","author":"a","subreddit":"r","score":1,"created_utc":1}).to_string());
    rows.extend(lines(&[comment("c2", "b", "r", "two", 1, "t3_x")]));

    let mut src = source(&rows);
    let ids: Vec<String> = src.by_ref().map(|r| r.unwrap().0.meta.id).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert_eq!(src.skipped(), 2);
}

#[test]
fn fingerprint_ignores_key_order_and_whitespace() {
    let a = Record::parse(r#"{"id":"c1","author":"a","subreddit":"r","body":"x","score":1,"created_utc":5,"parent_id":"t3_s"}"#).unwrap();
    let b = Record::parse(r#"{ "parent_id": "t3_s", "created_utc": 5, "score": 1, "body": "x", "subreddit": "r", "author": "a", "id": "c1" }"#).unwrap();
    let c = Record::parse(r#"{"id":"c1","author":"a","subreddit":"r","body":"y","score":1,"created_utc":5,"parent_id":"t3_s"}"#).unwrap();
    assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    assert_ne!(Fingerprint::of(&a), Fingerprint::of(&c));
    assert_eq!(a.line(), r#"{"id":"c1","author":"a","subreddit":"r","body":"x","score":1,"created_utc":5,"parent_id":"t3_s"}"#);
}
