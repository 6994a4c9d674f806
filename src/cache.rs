//! Rule lookup caching for URL creation
//!
//! Remembers, per route and parameter-name set, which rules were able to handle
//! a URL creation request so later requests try those rules first. Entries are
//! evicted least-recently-used first.

use crate::{trace_log, RouteParams};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Rule index cache with LRU eviction
///
/// Values are positions in the owning manager's rule list, so the cache must be
/// cleared whenever that list changes.
///
/// Default capacity: 1000 entries.
#[derive(Debug)]
pub struct RuleCache {
    entries: LruCache<String, Vec<usize>>,
    stats: CacheStats,
}

impl RuleCache {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` keys (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    /// Cache key for a route and the names of its parameters.
    pub fn key(route: &str, params: &RouteParams) -> String {
        let mut key = format!("{}?", route);
        for name in params.keys() {
            key.push_str(name);
            key.push('&');
        }
        key
    }

    pub fn clear(&mut self) {
        trace_log!("Clearing URL rule cache");
        self.entries.clear();
        self.stats.invalidations += 1;
    }

    pub fn get(&mut self, key: &str) -> Option<Vec<usize>> {
        if let Some(rules) = self.entries.get(key) {
            self.stats.hits += 1;
            trace_log!("Rule cache hit for '{}'", key);
            Some(rules.clone())
        } else {
            self.stats.misses += 1;
            trace_log!("Rule cache miss for '{}'", key);
            None
        }
    }

    /// Record that the rule at `index` can handle `key`.
    pub fn remember(&mut self, key: &str, index: usize) {
        if let Some(rules) = self.entries.get_mut(key) {
            if !rules.contains(&index) {
                rules.push(index);
            }
        } else {
            trace_log!("Caching rule {} for '{}'", index, key);
            self.entries.push(key.to_string(), vec![index]);
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RuleCache {
    fn clone(&self) -> Self {
        Self {
            entries: LruCache::new(self.entries.cap()),
            stats: self.stats.clone(),
        }
    }
}
