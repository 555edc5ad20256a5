#[path = "common/mod.rs"]
mod common;

use anyhow::Result;
use common::*;
use rextract::{review_reason, Record, RelevanceFilter, ReviewReason, RunState, SearchSpec, TagQuery, TaggedToken};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

fn rec(v: serde_json::Value) -> Record {
    Record::parse(&v.to_string()).unwrap()
}

fn filter(spec: SearchSpec) -> RelevanceFilter {
    RelevanceFilter::new(spec).unwrap()
}

#[test]
fn review_checks_popularity_before_bot_text() {
    let r = rec(comment("c1", "a", "r", "Hello, I'm a bot!", 5, "t3_x"));
    assert_eq!(review_reason(&r, Some(10)), Some(ReviewReason::LowScore));
    assert_eq!(review_reason(&r, Some(10)).unwrap().to_string(), "score below defined threshold");
    assert_eq!(review_reason(&r, Some(1)), Some(ReviewReason::BotGenerated));
    assert_eq!(review_reason(&r, None).unwrap().as_str(), "non-human generated");

    let human = rec(comment("c2", "a", "r", "just a person", 50, "t3_x"));
    assert_eq!(review_reason(&human, Some(10)), None);
}

#[test]
fn identity_is_case_folded_unless_case_sensitive() {
    let r = rec(comment("c1", "Alice", "AskReddit", "x", 1, "t3_x"));
    let mut state = RunState::new(true);

    let spec = SearchSpec { subreddits: Some(vec!["r/askreddit".into()]), ..Default::default() };
    assert!(filter(spec).check(&r, &mut state).unwrap());

    let mut state = RunState::new(true);
    let spec = SearchSpec { authors: Some(vec!["alice".into()]), case_sensitive: true, ..Default::default() };
    assert!(!filter(spec).check(&r, &mut state).unwrap());
    assert_eq!(state.admitted(), 0, "a rejected record leaves no fingerprint");
}

#[test]
fn toplevel_only_checks_parent_prefix() {
    let spec = || SearchSpec { top_level_only: true, ..Default::default() };
    let mut state = RunState::new(false);
    assert!(filter(spec()).check(&rec(comment("c1", "a", "r", "x", 1, "t3_s")), &mut state).unwrap());
    assert!(!filter(spec()).check(&rec(comment("c2", "a", "r", "x", 1, "t1_c1")), &mut state).unwrap());

    let no_parent = json!({"id":"c3","author":"a","subreddit":"r","body":"x","score":1,"created_utc":1});
    assert!(!filter(spec()).check(&rec(no_parent), &mut state).unwrap());

    // submissions are top-level themselves
    let s = rec(submission("s1", "a", "r", "t", "x", 1));
    assert!(filter(spec()).check(&s, &mut state).unwrap());
}

#[test]
fn text_regex_ignores_quoted_only_matches() {
    let quoted_only = rec(comment("c1", "a", "r", "&gt; rust is great\n\nagreed", 1, "t3_x"));
    let mut state = RunState::new(false);
    let spec = SearchSpec { comment_regex: Some("RUST".into()), ..Default::default() };
    assert!(!filter(spec.clone()).check(&quoted_only, &mut state).unwrap());

    let spec = SearchSpec { include_quoted: true, ..spec };
    assert!(filter(spec).check(&quoted_only, &mut state).unwrap());
}

#[test]
fn post_regex_applies_to_selftext_only() {
    let s = rec(submission("s1", "a", "r", "rust title", "nothing here", 1));
    let c = rec(comment("c1", "a", "r", "nothing here", 1, "t3_x"));
    let spec = SearchSpec { post_regex: Some("rust".into()), ..Default::default() };
    let mut f = filter(spec);
    let mut state = RunState::new(false);
    assert!(!f.check(&s, &mut state).unwrap());
    // comments are not constrained by the post regex
    assert!(f.check(&c, &mut state).unwrap());
}

#[test]
fn missing_flair_or_title_fails_field_regex() {
    let c = rec(comment("c1", "a", "r", "x", 1, "t3_x"));
    let mut state = RunState::new(false);
    let spec = SearchSpec { flair_regex: Some(".*".into()), ..Default::default() };
    assert!(!filter(spec).check(&c, &mut state).unwrap());
    let spec = SearchSpec { title_regex: Some(".*".into()), ..Default::default() };
    assert!(!filter(spec).check(&c, &mut state).unwrap());

    let s = rec(submission("s1", "a", "r", "Weekly thread", "", 1));
    let spec = SearchSpec { title_regex: Some("weekly".into()), flair_regex: Some("^mod$".into()), ..Default::default() };
    assert!(filter(spec).check(&s, &mut state).unwrap());
}

#[test]
fn dedup_runs_last_and_is_idempotent() {
    let a = comment("c1", "a", "r", "same", 1, "t3_x");
    // identical content, different key order
    let b = json!({"parent_id":"t3_x","link_id":"t3_s1","score":1,"created_utc":1136074600,"body":"same",
                   "subreddit":"r","author":"a","id":"c1","author_flair_text":null,"controversiality":0});
    let mut f = filter(SearchSpec::default());
    let mut state = RunState::new(true);
    assert!(f.check(&rec(a.clone()), &mut state).unwrap());
    assert!(!f.check(&rec(b), &mut state).unwrap());
    assert!(!f.check(&rec(a), &mut state).unwrap());
    assert_eq!(state.admitted(), 1);
    assert_eq!(state.tally().get("r"), 1);
}

#[test]
fn tally_disabled_counts_nothing() {
    let mut f = filter(SearchSpec::default());
    let mut state = RunState::new(false);
    assert!(f.check(&rec(comment("c1", "a", "r", "x", 1, "t3_x")), &mut state).unwrap());
    assert_eq!(state.tally().total(), 0);
}

#[test]
fn tag_search_prefilters_then_asks_tagger() {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let tagger = move |text: &str| -> Result<Vec<TaggedToken>> {
        seen.set(seen.get() + 1);
        Ok(text
            .split_whitespace()
            .map(|w| TaggedToken::new(w, if w.eq_ignore_ascii_case("run") { "VERB" } else { "X" }))
            .collect())
    };
    let spec = SearchSpec { tag: Some(TagQuery { token: "run".into(), tag: "VERB".into() }), ..Default::default() };
    let mut f = filter(spec).with_tagger(Box::new(tagger));
    let mut state = RunState::new(false);

    assert!(!f.check(&rec(comment("c1", "a", "r", "nothing relevant", 1, "t3_x")), &mut state).unwrap());
    assert_eq!(calls.get(), 0, "text without the token never reaches the tagger");

    assert!(f.check(&rec(comment("c2", "a", "r", "we run fast", 1, "t3_x")), &mut state).unwrap());
    assert!(!f.check(&rec(comment("c3", "a", "r", "rundown only", 1, "t3_x")), &mut state).unwrap());
    assert_eq!(calls.get(), 2);
}

#[test]
fn tag_search_without_tagger_is_an_error() {
    let spec = SearchSpec { tag: Some(TagQuery { token: "run".into(), tag: "VERB".into() }), ..Default::default() };
    let mut state = RunState::new(false);
    assert!(filter(spec).check(&rec(comment("c1", "a", "r", "run", 1, "t3_x")), &mut state).is_err());
}

#[test]
fn weights_and_row_spans_follow_qualifying_matches() {
    let r = rec(comment("c1", "a", "r", "cat cat\n&gt; cat\ncat", 1, "t3_x"));
    let f = filter(SearchSpec { comment_regex: Some("cat".into()), ..Default::default() });
    assert_eq!(f.weight(&r), 3);
    assert_eq!(f.row_spans(&r).len(), 3);
    assert_eq!(f.span_at(&r, 2).unwrap().unwrap().start, r.primary_text().rfind("cat").unwrap());
    assert!(f.span_at(&r, 3).is_none());

    let plain = filter(SearchSpec::default());
    assert_eq!(plain.weight(&r), 1);
    assert_eq!(plain.row_spans(&r), vec![None]);
    assert_eq!(plain.span_at(&r, 0), Some(None));
}

#[test]
fn review_can_be_disabled() {
    let r = rec(comment("c1", "a", "r", "i'm a bot", 1, "t3_x"));
    assert_eq!(filter(SearchSpec::default()).review(&r), Some(ReviewReason::BotGenerated));
    assert_eq!(filter(SearchSpec { review_filters: false, ..Default::default() }).review(&r), None);
}

#[cfg(unix)]
#[test]
fn process_tagger_parses_child_output() {
    use rextract::{ProcessTagger, Tagger};

    let mut tagger = ProcessTagger::new("sh").args(["-c", r#"awk '{for (i = 1; i <= NF; i++) print $i "\tNOUN"}'"#]);
    let tokens = tagger.tag("pop tart").unwrap();
    assert_eq!(tokens, vec![TaggedToken::new("pop", "NOUN"), TaggedToken::new("tart", "NOUN")]);

    let mut failing = ProcessTagger::new("sh").args(["-c", "exit 3"]);
    assert!(failing.tag("anything").is_err());

    assert!(ProcessTagger::from_command_line("   ").is_err());
}

#[cfg(unix)]
#[test]
fn process_tagger_tolerates_child_that_skips_stdin() {
    use rextract::{ProcessTagger, Tagger};

    let long = "word ".repeat(400_000);
    let mut tagger = ProcessTagger::new("sh").args(["-c", r#"printf 'word\tNOUN\n'"#]);
    assert_eq!(tagger.tag(&long).unwrap(), vec![TaggedToken::new("word", "NOUN")]);

    let mut failing = ProcessTagger::new("sh").args(["-c", "exit 1"]);
    assert!(failing.tag(&long).is_err(), "a failed child is still an error");
}
