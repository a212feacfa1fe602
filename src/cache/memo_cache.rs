use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe LRU memo table for pure matcher functions
///
/// Keys are the function's arguments, values its result. A miss only means the
/// value is recomputed, so entries can be evicted at any time without
/// affecting correctness.
pub struct MemoCache<K: Hash + Eq, V: Clone> {
    cache: Mutex<LruCache<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> MemoCache<K, V> {
    /// Create a new memo cache with the specified capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of results to keep (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        // Entries are plain values; a panic elsewhere cannot leave one half-written.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a cached result
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store a result in the cache
    pub fn put(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    /// Return the cached result for `key`, computing and storing it on a miss.
    ///
    /// The lock is not held while `compute` runs, so two workers missing on the
    /// same key may both compute it; the later `put` wins with an equal value.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.put(key, value.clone());
        value
    }

    /// Get the current number of cached entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all entries and reset the hit/miss counters
    pub fn clear(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Lookup statistics as `(hits, misses)`.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
