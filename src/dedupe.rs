//! Run-wide duplicate detection over canonical record serializations.

use crate::record::Record;
use ahash::AHashSet;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of a record's key-sorted JSON form. Identifies content, owns nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// `serde_json::Map` is a BTreeMap here (no `preserve_order`), so serializing
    /// the reparsed line yields keys in sorted order regardless of the input order.
    /// Only records that reach the dedup step pay for the reparse.
    pub fn of(record: &Record) -> Self {
        let canonical = serde_json::from_str::<Value>(record.line())
            .and_then(|v| serde_json::to_vec(&v))
            .unwrap_or_else(|_| record.line().as_bytes().to_vec());
        Self::of_bytes(&canonical)
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        f.write_str("…")
    }
}

/// Every fingerprint admitted so far in this run (across all months).
#[derive(Default)]
pub struct FingerprintSet {
    seen: AHashSet<Fingerprint>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `fp`; returns false if it was already present.
    pub fn insert(&mut self, fp: Fingerprint) -> bool {
        self.seen.insert(fp)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
