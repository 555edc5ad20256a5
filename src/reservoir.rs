//! Fixed-size uniform sample over a weighted stream of unknown length.
//!
//! A record offered with weight N contributes N unit items (one per qualifying
//! match). Each unit at global position n either fills a free slot or replaces
//! slot j for a uniform j in [0, n) when j < K. Entries share the record, so
//! memory stays O(K) no matter how long the stream runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct ReservoirEntry<T> {
    pub item: Rc<T>,
    /// Which of the item's qualifying matches this entry stands for.
    pub match_index: usize,
    /// Global 1-based stream position; used to flush in stream order.
    pub sequence: u64,
}

pub struct Reservoir<T> {
    capacity: usize,
    entries: Vec<ReservoirEntry<T>>,
    offered: u64,
    rng: StdRng,
}

impl<T> Reservoir<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    pub fn seeded(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self { capacity, entries: Vec::with_capacity(capacity.min(1 << 20)), offered: 0, rng }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Unit items offered so far across the whole run.
    pub fn offered(&self) -> u64 {
        self.offered
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offer `item` with `weight` unit items (match indexes `0..weight`).
    pub fn offer(&mut self, item: T, weight: usize) {
        if weight == 0 {
            return;
        }
        let item = Rc::new(item);
        for match_index in 0..weight {
            self.offer_unit(Rc::clone(&item), match_index);
        }
    }

    fn offer_unit(&mut self, item: Rc<T>, match_index: usize) {
        self.offered += 1;
        let n = self.offered;
        let entry = ReservoirEntry { item, match_index, sequence: n };
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
            return;
        }
        let j = self.rng.gen_range(0..n);
        if j < self.capacity as u64 {
            self.entries[j as usize] = entry;
        }
    }

    /// Consume the reservoir, returning entries in stream order.
    pub fn drain_in_stream_order(self) -> Vec<ReservoirEntry<T>> {
        let mut entries = self.entries;
        entries.sort_by_key(|e| e.sequence);
        entries
    }

    pub fn entries(&self) -> &[ReservoirEntry<T>] {
        &self.entries
    }
}
