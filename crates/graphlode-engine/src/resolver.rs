//! Probabilistic edge resolution.
//!
//! The columnar bulk path never keeps a full id map, so it cannot tell
//! which vertex label a reference target belongs to. The resolver
//! tracks one Bloom filter per label: membership answers may be wrong
//! positively (an extra candidate label, absorbed later by the
//! id-keyed join) but never negatively, so "no candidates" reliably
//! means the target never arrived.
//!
//! A resolver is scoped to a single import run and owned by its
//! accumulator. Nothing here is cached across runs.

use std::collections::BTreeMap;
use std::hash::{BuildHasher, RandomState};

/// Sizing for the per-label filters.
///
/// One label usually dominates the stream (files, typically); granting
/// it an order of magnitude more capacity keeps its false-positive
/// rate near the target without sizing every filter for the worst
/// case.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Label expected to dominate the input, if known.
    pub dominant_label: Option<String>,
    /// Capacity for the dominant label's filter.
    pub dominant_capacity: usize,
    /// Capacity for every other filter.
    pub default_capacity: usize,
    /// Target false-positive rate at capacity.
    pub false_positive_rate: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dominant_label: None,
            dominant_capacity: 1_000_000,
            default_capacity: 100_000,
            false_positive_rate: 0.01,
        }
    }
}

/// A fixed-size Bloom filter over string keys.
///
/// Uses two independent hashers combined by double hashing. Random
/// per-instance seeds are fine here: filters never outlive the run
/// and are never serialized.
#[derive(Debug)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    h1: RandomState,
    h2: RandomState,
}

impl BloomFilter {
    /// Size the filter for `capacity` insertions at the given
    /// false-positive rate.
    pub fn with_capacity(capacity: usize, false_positive_rate: f64) -> Self {
        let n = capacity.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;
        let num_bits = ((-n * false_positive_rate.ln()) / (ln2 * ln2)).ceil() as u64;
        let num_bits = num_bits.max(64);
        let num_hashes = ((num_bits as f64 / n) * ln2).round().max(1.0) as u32;
        Self {
            bits: vec![0u64; num_bits.div_ceil(64) as usize],
            num_bits,
            num_hashes,
            h1: RandomState::new(),
            h2: RandomState::new(),
        }
    }

    fn indices(&self, key: &str) -> impl Iterator<Item = u64> + '_ {
        let a = self.h1.hash_one(key);
        let b = self.h2.hash_one(key) | 1;
        (0..self.num_hashes as u64).map(move |i| a.wrapping_add(i.wrapping_mul(b)) % self.num_bits)
    }

    pub fn insert(&mut self, key: &str) {
        let indices: Vec<u64> = self.indices(key).collect();
        for bit in indices {
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.indices(key)
            .all(|bit| self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0)
    }
}

/// Per-label membership tracking for one import run.
#[derive(Debug)]
pub struct EdgeResolver {
    filters: BTreeMap<String, BloomFilter>,
    config: ResolverConfig,
}

impl EdgeResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            filters: BTreeMap::new(),
            config,
        }
    }

    /// Record that a vertex with this label and uid exists.
    pub fn add(&mut self, label: &str, uid: &str) {
        if !self.filters.contains_key(label) {
            let capacity = if self.config.dominant_label.as_deref() == Some(label) {
                self.config.dominant_capacity
            } else {
                self.config.default_capacity
            };
            self.filters.insert(
                label.to_string(),
                BloomFilter::with_capacity(capacity, self.config.false_positive_rate),
            );
        }
        if let Some(filter) = self.filters.get_mut(label) {
            filter.insert(uid);
        }
    }

    /// Labels that may hold a vertex with this uid, in label order.
    /// Empty means the uid definitely never arrived.
    pub fn candidates(&self, uid: &str) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|(_, filter)| filter.contains(uid))
            .map(|(label, _)| label.as_str())
            .collect()
    }
}
