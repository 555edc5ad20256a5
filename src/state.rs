//! State that lives for a whole run (all months): seen fingerprints, the sample
//! reservoir and the per-subreddit tally. Passed explicitly to every stage.

use crate::counting::SubredditTally;
use crate::dedupe::{Fingerprint, FingerprintSet};
use crate::record::Record;
use crate::reservoir::Reservoir;

pub struct RunState {
    fingerprints: FingerprintSet,
    tally: SubredditTally,
    reservoir: Option<Reservoir<Record>>,
    track_stats: bool,
}

impl RunState {
    pub fn new(track_stats: bool) -> Self {
        Self { fingerprints: FingerprintSet::new(), tally: SubredditTally::new(), reservoir: None, track_stats }
    }

    pub fn with_reservoir(mut self, reservoir: Reservoir<Record>) -> Self {
        self.reservoir = Some(reservoir);
        self
    }

    /// Final dedup step of the relevance filter: admits `record` unless an
    /// identical one was admitted earlier in the run. Admission counts toward the
    /// subreddit tally.
    pub fn admit(&mut self, record: &Record) -> bool {
        if !self.fingerprints.insert(Fingerprint::of(record)) {
            return false;
        }
        if self.track_stats {
            self.tally.increment(&record.meta.subreddit);
        }
        true
    }

    pub fn is_sampling(&self) -> bool {
        self.reservoir.is_some()
    }

    /// Offer an admitted record to the reservoir with `weight` unit items.
    /// No-op when not sampling.
    pub fn offer(&mut self, record: Record, weight: usize) {
        if let Some(r) = self.reservoir.as_mut() {
            r.offer(record, weight);
        }
    }

    pub fn take_reservoir(&mut self) -> Option<Reservoir<Record>> {
        self.reservoir.take()
    }

    pub fn tally(&self) -> &SubredditTally {
        &self.tally
    }

    /// Distinct records admitted so far.
    pub fn admitted(&self) -> usize {
        self.fingerprints.len()
    }
}
