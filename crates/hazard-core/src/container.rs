//! Thread-safe key/value container with per-call atomicity.
//!
//! Every method on [`SharedMap`] is atomic on its own. Nothing makes a
//! *sequence* of calls atomic: a caller that reads [`SharedMap::len`] and then
//! calls [`SharedMap::put_all`] based on that reading races every other caller
//! doing the same. The fill scenario depends on exactly that gap.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

/// Lock-free accumulator shared by every worker touching the same key.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Counter {
            value: AtomicU64::new(0),
        }
    }

    /// Add one. Safe under any number of concurrent callers.
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n`.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current total. A snapshot, not a barrier: increments in flight may be missing.
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Map from string key to `V`.
#[derive(Debug)]
pub struct SharedMap<V> {
    entries: DashMap<String, V>,
}

impl<V> Default for SharedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SharedMap<V> {
    pub fn new() -> Self {
        SharedMap {
            entries: DashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SharedMap {
            entries: DashMap::with_capacity(capacity),
        }
    }

    /// Number of entries at the instant of the call.
    ///
    /// The value is stale as soon as it is returned; do not combine it with a
    /// later write and expect the pair to be consistent.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a single entry, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    /// Merge every entry. Each insert is atomic; the batch as a whole is not.
    ///
    /// Returns the number of keys that were not present before.
    pub fn put_all<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let mut added = 0;
        for (key, value) in entries {
            if self.entries.insert(key, value).is_none() {
                added += 1;
            }
        }
        trace!(added, "put_all merged");
        added
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl<V: Clone> SharedMap<V> {
    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Return the value for `key`, installing `make()` first if it is absent.
    ///
    /// The check and the install happen under the key's shard lock, so `make`
    /// runs at most once per key no matter how many callers race on it.
    pub fn get_or_insert_with<F>(&self, key: &str, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(existing) = self.entries.get(key) {
            return existing.value().clone();
        }
        self.entries
            .entry(key.to_string())
            .or_insert_with(make)
            .value()
            .clone()
    }
}

/// Per-key counters built on [`SharedMap`] and get-or-create.
#[derive(Debug, Default)]
pub struct CounterMap {
    counters: SharedMap<Arc<Counter>>,
    created: AtomicU64,
}

impl CounterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CounterMap {
            counters: SharedMap::with_capacity(capacity),
            created: AtomicU64::new(0),
        }
    }

    /// Existing handle for `key`, or a fresh one installed exactly once.
    pub fn get_or_create_counter(&self, key: &str) -> Arc<Counter> {
        self.counters.get_or_insert_with(key, || {
            self.created.fetch_add(1, Ordering::Relaxed);
            Arc::new(Counter::new())
        })
    }

    pub fn get(&self, key: &str) -> Option<Arc<Counter>> {
        self.counters.get(key)
    }

    /// Number of keys with a counter.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// How many counter handles were ever constructed.
    pub fn counters_created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Current value of every counter, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().value()))
            .collect()
    }

    /// Sum over all counters right now.
    pub fn total(&self) -> u64 {
        self.counters
            .entries
            .iter()
            .map(|e| e.value().value())
            .sum()
    }
}
