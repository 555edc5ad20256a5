//! Stream decoder: turns a (possibly compressed) monthly dump into complete text lines.
//!
//! Chunks are decoded as UTF-8 as a whole. When a multi-byte character is cut at
//! the end of a chunk the decoder reads another chunk and retries, up to a
//! cumulative ceiling; past the ceiling the file is undecodable.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::util::open_with_backoff;

/// Default chunk read from the decompression stream (128 MiB).
pub const DEFAULT_CHUNK_BYTES: usize = 1 << 27;
/// Default cumulative ceiling for a single decode attempt (1 GiB).
pub const DEFAULT_MAX_WINDOW_BYTES: u64 = 1 << 30;

/// Container format, derived from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd,
    Xz,
    Bzip2,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("zst") => Compression::Zstd,
            Some("xz") => Compression::Xz,
            Some("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Zstd => ".zst",
            Compression::Xz => ".xz",
            Compression::Bzip2 => ".bz2",
        }
    }

    /// Wrap a raw byte source in the matching streaming decompressor.
    pub fn wrap<'a, R: Read + 'a>(self, inner: R) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(inner),
            Compression::Zstd => {
                let mut decoder = zstd::stream::read::Decoder::new(inner)?;
                // Late dumps use frames with windows beyond the default limit.
                decoder.window_log_max(31)?;
                Box::new(decoder)
            }
            Compression::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(inner)),
            Compression::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(inner)),
        })
    }
}

/// Fatal, per-file decode failures.
#[derive(Debug)]
pub enum DecodeError {
    /// A character still could not be completed after reading `bytes_read` bytes.
    CeilingExceeded { bytes_read: u64, ceiling: u64 },
    /// Bytes that are not UTF-8 at all (not just cut off).
    InvalidUtf8 { valid_up_to: usize },
    /// Stream ended in the middle of a multi-byte character.
    TruncatedAtEof { dangling: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::CeilingExceeded { bytes_read, ceiling } => write!(
                f,
                "unable to decode frame after reading {bytes_read} bytes (ceiling {ceiling})"
            ),
            DecodeError::InvalidUtf8 { valid_up_to } => {
                write!(f, "invalid UTF-8 after {valid_up_to} valid bytes of the current window")
            }
            DecodeError::TruncatedAtEof { dangling } => {
                write!(f, "stream ended inside a multi-byte character ({dangling} dangling bytes)")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A `Read` wrapper that counts raw (compressed) bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Lazy line iterator over a decompression stream.
///
/// Yields `(line, offset)` where `offset` is the number of raw input bytes consumed
/// so far. Line terminators (`\n`, `\r\n`) are stripped.
pub struct LineDecoder<'a> {
    reader: Option<Box<dyn Read + 'a>>,
    counter: Arc<AtomicU64>,
    chunk_bytes: usize,
    max_window_bytes: u64,
    carry: String,
    pending: VecDeque<String>,
}

impl<'a> LineDecoder<'a> {
    pub fn new<R: Read + 'a>(inner: R, compression: Compression) -> io::Result<Self> {
        Self::with_limits(inner, compression, DEFAULT_CHUNK_BYTES, DEFAULT_MAX_WINDOW_BYTES)
    }

    pub fn with_limits<R: Read + 'a>(
        inner: R,
        compression: Compression,
        chunk_bytes: usize,
        max_window_bytes: u64,
    ) -> io::Result<Self> {
        let counter = Arc::new(AtomicU64::new(0));
        let counted = CountingReader { inner, counter: counter.clone() };
        Ok(Self {
            reader: Some(compression.wrap(counted)?),
            counter,
            chunk_bytes: chunk_bytes.max(1),
            max_window_bytes,
            carry: String::new(),
            pending: VecDeque::new(),
        })
    }

    /// Raw bytes consumed from the underlying source so far.
    pub fn offset(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Read one chunk (plus retries) and decode it. `Ok(None)` once the source is drained.
    fn read_and_decode(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else { return Ok(None) };
        let mut window: Vec<u8> = Vec::with_capacity(self.chunk_bytes.min(1 << 20));
        let mut bytes_read: u64 = 0;

        loop {
            let n = reader
                .by_ref()
                .take(self.chunk_bytes as u64)
                .read_to_end(&mut window)
                .context("reading from decompression stream")?;
            bytes_read += n as u64;

            match String::from_utf8(window) {
                Ok(text) => {
                    if n == 0 && text.is_empty() {
                        // Exhausted: close the decompressor.
                        self.reader = None;
                        return Ok(None);
                    }
                    return Ok(Some(text));
                }
                Err(err) => {
                    let utf8 = err.utf8_error();
                    if utf8.error_len().is_some() {
                        return Err(DecodeError::InvalidUtf8 { valid_up_to: utf8.valid_up_to() }.into());
                    }
                    window = err.into_bytes();
                    if n == 0 {
                        let dangling = window.len() - utf8.valid_up_to();
                        return Err(DecodeError::TruncatedAtEof { dangling }.into());
                    }
                    if bytes_read > self.max_window_bytes {
                        return Err(DecodeError::CeilingExceeded {
                            bytes_read,
                            ceiling: self.max_window_bytes,
                        }
                        .into());
                    }
                    tracing::debug!(bytes_read, "decoding error at chunk boundary, reading another chunk");
                }
            }
        }
    }

    fn refill(&mut self) -> Result<bool> {
        while self.pending.is_empty() {
            match self.read_and_decode()? {
                Some(chunk) => {
                    let mut text = std::mem::take(&mut self.carry);
                    text.push_str(&chunk);
                    let mut parts: Vec<&str> = text.split('\n').collect();
                    let rest = parts.pop().unwrap_or("");
                    self.carry = rest.to_string();
                    self.pending.extend(parts.into_iter().map(strip_cr));
                }
                None => {
                    if self.carry.is_empty() {
                        return Ok(false);
                    }
                    let last = std::mem::take(&mut self.carry);
                    self.pending.push_back(strip_cr(&last));
                }
            }
        }
        Ok(true)
    }
}

fn strip_cr(s: &str) -> String {
    s.strip_suffix('\r').unwrap_or(s).to_string()
}

impl Iterator for LineDecoder<'_> {
    type Item = Result<(String, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.refill() {
            Ok(true) => {
                let line = self.pending.pop_front()?;
                Some(Ok((line, self.offset())))
            }
            Ok(false) => None,
            Err(e) => {
                // Poison: a failed file yields nothing further.
                self.reader = None;
                self.pending.clear();
                self.carry.clear();
                Some(Err(e))
            }
        }
    }
}

/// Open a monthly dump for line decoding, choosing the decompressor from its extension.
pub fn open_lines(path: &Path, chunk_bytes: usize, max_window_bytes: u64) -> Result<LineDecoder<'static>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    LineDecoder::with_limits(file, Compression::from_path(path), chunk_bytes, max_window_bytes)
        .with_context(|| format!("init decompressor for {}", path.display()))
}

/// Log a skipped file with its canonical path (used when corrupt files are tolerated).
pub fn warn_decode_skip(path: &Path, e: &anyhow::Error) {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    tracing::warn!(
        path = %abs.display(),
        error = %e,
        "Skipping file after decode error; records admitted before the error are kept"
    );
}
