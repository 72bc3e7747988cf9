//! Bounded loading cache and the process-wide regex cache.
//!
//! The eviction policy is deliberately blunt: when the map reaches capacity
//! it is cleared whole and the new entry inserted. That keeps the write path
//! O(1) amortised with no LRU bookkeeping; a monotonic counter records how
//! often it happens.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::errors::Error;

pub(crate) const DEFAULT_CAPACITY: usize = 65_536;

/// Map from key to loaded value, filled on demand by a loader function.
///
/// Readers share a read lock; the loader runs outside any lock, so two
/// threads missing on the same key may both compute it — the second result
/// is dropped, which is acceptable. Capacity 0 means unbounded growth.
pub(crate) struct LoadingCache<K, V> {
    capacity: usize,
    load: Box<dyn Fn(&K) -> Result<V, Error> + Send + Sync>,
    map: RwLock<HashMap<K, Arc<V>>>,
    resets: AtomicU64,
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(
        capacity: usize,
        load: impl Fn(&K) -> Result<V, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            capacity,
            load: Box::new(load),
            map: RwLock::new(HashMap::new()),
            resets: AtomicU64::new(0),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Result<Arc<V>, Error> {
        if let Some(found) = self.map.read().expect("cache lock poisoned").get(key) {
            return Ok(Arc::clone(found));
        }
        let value = Arc::new((self.load)(key)?);
        let mut map = self.map.write().expect("cache lock poisoned");
        if self.capacity > 0 && map.len() >= self.capacity {
            map.clear();
            let resets = self.resets.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(resets, capacity = self.capacity, "regex cache reset");
        }
        Ok(Arc::clone(
            map.entry(key.clone()).or_insert(value),
        ))
    }

    pub(crate) fn len(&self) -> usize {
        self.map.read().expect("cache lock poisoned").len()
    }

    pub(crate) fn resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }
}

type RegexCache = LoadingCache<String, fancy_regex::Regex>;

fn new_regex_cache(capacity: usize) -> RegexCache {
    LoadingCache::new(capacity, |pattern: &String| {
        fancy_regex::Regex::new(pattern)
            .map_err(|err| Error::build(format!("invalid pattern {pattern:?}: {err}")))
    })
}

static REGEX_CACHE: Lazy<RwLock<Arc<RegexCache>>> =
    Lazy::new(|| RwLock::new(Arc::new(new_regex_cache(DEFAULT_CAPACITY))));

/// Replace the global regex cache with a fresh one of the given capacity.
/// Capacity 0 means unbounded.
pub fn set_regex_cache(capacity: usize) {
    tracing::debug!(capacity, "regex cache reconfigured");
    *REGEX_CACHE.write().expect("cache lock poisoned") = Arc::new(new_regex_cache(capacity));
}

/// Fetch a compiled regex for `pattern`, compiling and interning on a miss.
pub(crate) fn get_regex(pattern: &str) -> Result<Arc<fancy_regex::Regex>, Error> {
    let cache = Arc::clone(&REGEX_CACHE.read().expect("cache lock poisoned"));
    cache.get(&pattern.to_string())
}
