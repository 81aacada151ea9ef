//! A bounded, first-come in-process cache for metadata shared across a run.
//!
//! The cache holds at most `capacity` entries. Once full, new entries are refused and the
//! refusal is logged; existing entries are never evicted or expired. Each entry carries a
//! cleanup hook that runs when the cache is closed.

use crate::HashMap;
use core::fmt::{Debug, Formatter};

const LOG_TARGET: &str = "    memory";

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 1024;

type Cleanup<V> = Box<dyn FnOnce(V) + Send>;

struct Entry<V> {
    value: V,
    cleanup: Option<Cleanup<V>>,
}

/// Exact-match string keyed cache with a fixed capacity.
pub struct MemoryCache<V> {
    entries: HashMap<String, Entry<V>>,
    capacity: usize,
}

impl<V> Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<V> MemoryCache<V> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: crate::hash_map_with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Look up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        let entry = self.entries.get(key);
        if entry.is_some() {
            log::trace!(target: LOG_TARGET, "Memory cache hit for {key}");
        } else {
            log::trace!(target: LOG_TARGET, "Memory cache miss for {key}");
        }

        entry.map(|e| &e.value)
    }

    /// Store a value with a hook invoked on [`close`](Self::close).
    ///
    /// Returns `false` when the entry was refused because the cache is full. Re-inserting an
    /// existing key replaces its value without consuming capacity.
    pub fn put(&mut self, key: impl Into<String>, value: V, cleanup: impl FnOnce(V) + Send + 'static) -> bool {
        let key = key.into();

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            log::warn!(target: LOG_TARGET, "Memory cache capacity ({}) exceeded, not caching {key}", self.capacity);
            return false;
        }

        let entry = Entry {
            value,
            cleanup: Some(Box::new(cleanup)),
        };

        if let Some(previous) = self.entries.insert(key, entry) {
            previous.release();
        }

        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every entry, running its cleanup hook.
    pub fn close(self) {
        log::debug!(target: LOG_TARGET, "Releasing {} memory cache entries", self.entries.len());
        for (_, entry) in self.entries {
            entry.release();
        }
    }
}

impl<V> Entry<V> {
    fn release(mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup(self.value);
        }
    }
}
