//! Explicit per-tick memoization.
//!
//! Capacity queries over logistics sources are asked many times per tick
//! while the answer only changes between ticks. A [`TickCache`] holds those
//! answers until the owner calls [`TickCache::new_tick`]; there is no
//! hidden global state and no time-based expiry.

use std::collections::BTreeMap;

/// Values memoized for the duration of one tick.
#[derive(Debug, Clone)]
pub struct TickCache<K: Ord, V> {
    tick: Option<u64>,
    values: BTreeMap<K, V>,
}

impl<K: Ord, V> TickCache<K, V> {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            tick: None,
            values: BTreeMap::new(),
        }
    }

    /// Start a new tick. Clears every entry if `tick` differs from the tick
    /// the cache was filled in.
    pub fn new_tick(&mut self, tick: u64) {
        if self.tick != Some(tick) {
            self.values.clear();
            self.tick = Some(tick);
        }
    }

    /// Cached value for `key`, computing it on first access this tick.
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        self.values.entry(key).or_insert_with(compute)
    }

    /// Cached value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Store a value for `key`.
    pub fn insert(&mut self, key: K, value: V) {
        self.values.insert(key, value);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Ord, V> Default for TickCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once_per_tick() {
        let mut cache: TickCache<u32, u32> = TickCache::new();
        let mut calls = 0_u32;
        cache.new_tick(1);
        for _ in 0..3 {
            let _ = cache.get_or_insert_with(7, || {
                calls = calls.saturating_add(1);
                42
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.get(&7), Some(&42));
    }

    #[test]
    fn new_tick_clears_entries() {
        let mut cache: TickCache<u32, u32> = TickCache::new();
        cache.new_tick(1);
        cache.insert(1, 10);
        cache.new_tick(1);
        assert_eq!(cache.len(), 1);
        cache.new_tick(2);
        assert!(cache.is_empty());
    }
}
