#[path = "common/mod.rs"]
mod common;

use common::*;
use rextract::{open_lines, Compression, DecodeError, LineDecoder};
use std::io::Cursor;

fn collect(dec: LineDecoder<'_>) -> Vec<String> {
    dec.map(|r| r.unwrap().0).collect()
}

/// A 4-byte emoji and 2-byte umlauts cut at every possible position by 1..=5
/// byte chunks must still decode to the original lines.
#[test]
fn multibyte_chars_split_across_chunks() {
    let text = "grüße 🦀\nnaïve\r\nplain\n";
    for chunk in 1..=5 {
        let dec = LineDecoder::with_limits(Cursor::new(text.as_bytes().to_vec()), Compression::None, chunk, 64).unwrap();
        assert_eq!(collect(dec), vec!["grüße 🦀", "naïve", "plain"], "chunk size {chunk}");
    }
}

#[test]
fn zstd_stream_with_tiny_chunks() {
    let data = zst_bytes("αβγ\n{\"a\":1}\n".as_bytes());
    let dec = LineDecoder::with_limits(Cursor::new(data), Compression::Zstd, 3, 1 << 10).unwrap();
    assert_eq!(collect(dec), vec!["αβγ", "{\"a\":1}"]);
}

/// Last line without a trailing newline is still yielded.
#[test]
fn final_line_without_newline() {
    let dec = LineDecoder::new(Cursor::new(b"one\ntwo".to_vec()), Compression::None).unwrap();
    assert_eq!(collect(dec), vec!["one", "two"]);
}

#[test]
fn ceiling_exceeded_is_fatal() {
    // 4-byte char with 1-byte chunks: needs 4 reads, ceiling allows 2.
    let dec = LineDecoder::with_limits(Cursor::new("🦀\n".as_bytes().to_vec()), Compression::None, 1, 2).unwrap();
    let results: Vec<_> = dec.collect();
    assert_eq!(results.len(), 1, "a failed decoder yields nothing after the error");
    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(matches!(err.downcast_ref::<DecodeError>(), Some(DecodeError::CeilingExceeded { .. })), "{err}");
}

#[test]
fn invalid_utf8_is_fatal() {
    let mut bytes = b"ok\n".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
    let mut dec = LineDecoder::new(Cursor::new(bytes), Compression::None).unwrap();
    let err = dec.next().unwrap().unwrap_err();
    assert!(matches!(err.downcast_ref::<DecodeError>(), Some(DecodeError::InvalidUtf8 { .. })));
    assert!(dec.next().is_none());
}

#[test]
fn truncated_char_at_eof_is_fatal() {
    let bytes = "ab\n🦀".as_bytes();
    let cut = bytes[..bytes.len() - 2].to_vec();
    let mut dec = LineDecoder::with_limits(Cursor::new(cut), Compression::None, 1 << 10, 1 << 20).unwrap();
    let err = dec.next().unwrap().unwrap_err();
    assert!(matches!(err.downcast_ref::<DecodeError>(), Some(DecodeError::TruncatedAtEof { dangling: 2 })));
}

#[test]
fn offsets_are_monotonic_and_reach_file_size() {
    let data = zst_bytes(b"a\nb\nc\n");
    let total = data.len() as u64;
    let dec = LineDecoder::with_limits(Cursor::new(data), Compression::Zstd, 2, 1 << 10).unwrap();
    let offsets: Vec<u64> = dec.map(|r| r.unwrap().1).collect();
    assert_eq!(offsets.len(), 3);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    assert!(*offsets.last().unwrap() <= total);
}

#[test]
fn open_lines_picks_decompressor_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec!["{\"x\":\"ü\"}".to_string(), "{\"x\":2}".to_string()];
    let xz = dir.path().join("RC_2010-01.xz");
    let bz = dir.path().join("RC_2010-02.bz2");
    let plain = dir.path().join("RC_2010-03");
    write_xz_lines(&xz, &rows);
    write_bz2_lines(&bz, &rows);
    write_plain_lines(&plain, &rows);
    for p in [&xz, &bz, &plain] {
        let got = collect(open_lines(p, 4, 1 << 10).unwrap());
        assert_eq!(got, rows, "{}", p.display());
    }
}
