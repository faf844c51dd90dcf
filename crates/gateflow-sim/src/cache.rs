//! Simulation Cache
//!
//! Bounded least-recently-used cache of subcircuit results, keyed by template
//! identity, template version and the instance's input bits. Entries are kept
//! in an `IndexMap` ordered from least to most recently used: a hit moves the
//! entry to the back, and an insertion at capacity evicts the front.
//!
//! The cache never notices template edits by itself. Folding the template
//! version into the key makes a bumped template miss automatically; callers
//! that edit templates in place without bumping the version must call
//! [`SimulationCache::invalidate_template`].

use crate::warning::SimWarning;
use bitvec::prelude::*;
use gateflow_netlist::{Template, TemplateId};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

/// Typed cache key: template, template version and input vector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub template: TemplateId,
    pub version: u64,
    pub inputs: BitVec,
}

impl CacheKey {
    pub fn new(template: &Template, inputs: &[bool]) -> Self {
        Self {
            template: template.id.clone(),
            version: template.version,
            inputs: inputs.iter().copied().collect(),
        }
    }
}

/// What the subcircuit evaluator stores for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub outputs: Vec<bool>,
    /// Warnings raised while computing the outputs, relative to the instance
    pub warnings: Vec<SimWarning>,
    /// Deepest nesting reached below the instance (0 for a flat template)
    pub height: usize,
}

/// A cached result plus diagnostics
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: CachedResult,
    /// Number of lookups served by this entry
    pub hits: u64,
    /// Cache tick of the most recent insert or hit
    pub last_access: u64,
}

/// Aggregate cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// LRU cache of (template, inputs) -> outputs
#[derive(Debug, Clone)]
pub struct SimulationCache {
    entries: IndexMap<CacheKey, CacheEntry>,
    capacity: usize,
    tick: u64,
    stats: CacheStats,
}

impl Default for SimulationCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl SimulationCache {
    /// Create a cache holding at most `capacity` entries (0 disables caching)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity.min(4096)),
            capacity,
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up a result, marking the entry most recently used on a hit
    pub fn lookup(&mut self, key: &CacheKey) -> Option<CachedResult> {
        self.lookup_within(key, usize::MAX)
    }

    /// Look up a result whose nesting height is at most `max_height`
    ///
    /// An entry that needs more nesting than the caller has left counts as a
    /// miss and keeps its recency.
    pub fn lookup_within(&mut self, key: &CacheKey, max_height: usize) -> Option<CachedResult> {
        self.tick += 1;
        let Some(idx) = self.entries.get_index_of(key) else {
            self.stats.misses += 1;
            trace!(template = %key.template, "cache miss");
            return None;
        };
        if let Some((_, entry)) = self.entries.get_index(idx) {
            if entry.result.height > max_height {
                self.stats.misses += 1;
                trace!(
                    template = %key.template,
                    height = entry.result.height,
                    max_height,
                    "cache miss: entry nests too deep"
                );
                return None;
            }
        }

        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        let (_, entry) = self.entries.get_index_mut(last)?;
        entry.hits += 1;
        entry.last_access = self.tick;
        self.stats.hits += 1;
        trace!(template = %key.template, hits = entry.hits, "cache hit");
        Some(entry.result.clone())
    }

    /// Store a result, evicting the least recently used entry when full
    pub fn insert(&mut self, key: CacheKey, result: CachedResult) {
        if self.capacity == 0 {
            return;
        }
        self.tick += 1;

        if let Some(idx) = self.entries.get_index_of(&key) {
            let last = self.entries.len() - 1;
            self.entries.move_index(idx, last);
            if let Some((_, entry)) = self.entries.get_index_mut(last) {
                entry.result = result;
                entry.last_access = self.tick;
            }
            return;
        }

        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                self.stats.evictions += 1;
                trace!(template = %evicted.template, "cache eviction");
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                result,
                hits: 0,
                last_access: self.tick,
            },
        );
        self.stats.insertions += 1;
    }

    /// Drop every entry for a template, returning how many were removed
    pub fn invalidate_template(&mut self, template: &TemplateId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| &key.template != template);
        let removed = before - self.entries.len();
        self.stats.invalidations += removed as u64;
        trace!(template = %template, removed, "cache invalidated");
        removed
    }

    /// Drop every entry; counters are kept
    pub fn clear(&mut self) {
        self.stats.invalidations += self.entries.len() as u64;
        self.entries.clear();
    }

    /// Inspect an entry without touching its recency
    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
