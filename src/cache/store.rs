//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with an eviction list for LRU
//! ordering and one expiry timer per entry for the age bound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheEvent, CacheStats, EvictionList};
use crate::config::CacheConfig;
use crate::tasks::{schedule_expiry, ExpiryTimer};

// == Store State ==
#[derive(Debug)]
struct StoreInner<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency order, least recently used first
    order: EvictionList<String>,
    /// Pending expiry per key
    timers: HashMap<String, ExpiryTimer>,
    /// Performance statistics
    stats: CacheStats,
    /// Incremented on every `set`; tags the timer it schedules
    generation: u64,
    config: CacheConfig,
}

impl<V> StoreInner<V> {
    /// Drops the entry, its node and its timer. Returns whether it existed.
    fn purge(&mut self, key: &str) -> bool {
        self.timers.remove(key);
        self.order.remove(key);
        self.entries.remove(key).is_some()
    }

    fn evict_lru(&mut self) -> Option<String> {
        let key = self.order.remove_first()?;
        self.timers.remove(&key);
        self.entries.remove(&key);
        self.stats.record(CacheEvent::Eviction);
        debug!(key = %key, "evicted least recently used entry");
        Some(key)
    }

    fn enforce_capacity(&mut self) {
        while self.order.len() > self.config.max_length() {
            if self.evict_lru().is_none() {
                break;
            }
        }
    }

    /// Timer callback. A timer replaced by a later `set` carries an older
    /// generation and is ignored.
    fn expire(&mut self, key: &str, generation: u64) {
        let current = self.timers.get(key).map(ExpiryTimer::generation);
        if current != Some(generation) {
            debug!(key = %key, generation, "stale expiry timer ignored");
            return;
        }
        if let Some(timer) = self.timers.remove(key) {
            timer.disarm();
        }
        self.order.remove(key);
        if self.entries.remove(key).is_some() {
            self.stats.record(CacheEvent::Expiration);
            debug!(key = %key, "entry expired");
        }
    }

    /// Removes `key` if its deadline has passed. Covers the window before the
    /// timer task runs and stores used outside a runtime.
    fn expire_if_due(&mut self, key: &str) -> bool {
        let due = self.entries.get(key).is_some_and(CacheEntry::is_expired);
        if due {
            self.purge(key);
            self.stats.record(CacheEvent::Expiration);
            debug!(key = %key, "entry expired on access");
        }
        due
    }
}

// == Cache Store ==
/// Bounded, age-expiring cache keyed by fingerprint.
///
/// Cloning is cheap and yields a handle to the same store. Every operation
/// runs under one lock as a unit and never suspends while holding it.
#[derive(Debug)]
pub struct CacheStore<V> {
    inner: Arc<Mutex<StoreInner<V>>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + 'static> CacheStore<V> {
    // == Constructor ==
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                entries: HashMap::new(),
                order: EvictionList::new(),
                timers: HashMap::new(),
                stats: CacheStats::new(),
                generation: 0,
                config,
            })),
        }
    }

    // == Has ==
    /// Membership test. Does not change recency.
    pub fn has(&self, key: &str) -> bool {
        let mut inner = self.lock();
        if inner.expire_if_due(key) {
            return false;
        }
        inner.entries.contains_key(key)
    }

    // == Get ==
    /// Returns a clone of the value and marks the key most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        if inner.expire_if_due(key) {
            inner.stats.record(CacheEvent::Miss);
            return None;
        }

        let Some(value) = inner.entries.get(key).map(|entry| entry.value.clone()) else {
            inner.stats.record(CacheEvent::Miss);
            return None;
        };

        if let Some(node_key) = inner.order.remove(key) {
            inner.order.append(node_key);
        }
        inner.enforce_capacity();
        inner.stats.record(CacheEvent::Hit);
        Some(value)
    }

    // == Set ==
    /// Inserts or refreshes `key`.
    ///
    /// A refresh replaces the value, moves the key to the most recently used
    /// end and restarts its expiry. A new key past capacity evicts the least
    /// recently used entry together with that entry's timer.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut inner = self.lock();
        let max_age = inner.config.max_age();

        if inner.entries.contains_key(&key) {
            inner.order.remove(key.as_str());
        }
        inner
            .entries
            .insert(key.clone(), CacheEntry::new(value, max_age));
        inner.order.append(key.clone());
        inner.enforce_capacity();

        inner.generation += 1;
        let generation = inner.generation;
        let weak: Weak<Mutex<StoreInner<V>>> = Arc::downgrade(&self.inner);
        let timer_key = key.clone();
        let timer = schedule_expiry(max_age, generation, move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .expire(&timer_key, generation);
            }
        });
        debug!(key = %key, generation, scheduled = timer.is_scheduled(), "entry stored");
        // Replacing the previous timer drops and aborts it
        inner.timers.insert(key, timer);
    }

    // == Time To Live ==
    /// Remaining lifetime of `key`, `None` when absent or expired. Does not
    /// change recency.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let mut inner = self.lock();
        if inner.expire_if_due(key) {
            return None;
        }
        inner.entries.get(key).map(CacheEntry::ttl_remaining)
    }

    // == Delete ==
    /// Removes `key` and cancels its timer. Absent keys are a no-op.
    pub fn delete(&self, key: &str) -> bool {
        self.lock().purge(key)
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    // == Keys ==
    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lock().order.keys().cloned().collect()
    }

    /// Removes every entry and cancels every timer. Stats are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.timers.clear();
        inner.order.clear();
        inner.entries.clear();
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        inner.stats.snapshot(inner.entries.len())
    }

    pub fn config(&self) -> CacheConfig {
        self.lock().config
    }

    #[cfg(test)]
    fn timer_count(&self) -> usize {
        self.lock().timers.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
