//! Cache Statistics Module
//!
//! Counters for lookups and removals, fed one [`CacheEvent`] at a time by
//! the store.

use serde::Serialize;

/// Something the store did that the counters care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
    /// Removed to respect the length bound.
    Eviction,
    /// Removed once its max age elapsed.
    Expiration,
}

// == Cache Stats ==
/// Point-in-time view of the store counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// `get` calls that found a live entry
    pub hits: u64,
    /// `get` calls that found nothing (absent or expired)
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Live entries at snapshot time
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: CacheEvent) {
        match event {
            CacheEvent::Hit => self.hits += 1,
            CacheEvent::Miss => self.misses += 1,
            CacheEvent::Eviction => self.evictions += 1,
            CacheEvent::Expiration => self.expirations += 1,
        }
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of lookups that hit; 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }

    /// Copy of the counters with `total_entries` filled in.
    pub fn snapshot(&self, total_entries: usize) -> Self {
        Self {
            total_entries,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_counters_are_zero() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.lookups(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_record_routes_each_event() {
        let mut stats = CacheStats::new();
        for event in [
            CacheEvent::Hit,
            CacheEvent::Hit,
            CacheEvent::Hit,
            CacheEvent::Miss,
            CacheEvent::Eviction,
            CacheEvent::Expiration,
            CacheEvent::Expiration,
        ] {
            stats.record(event);
        }

        assert_eq!(stats.lookups(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 2);
    }

    #[test]
    fn test_snapshot_fills_entry_count() {
        let mut stats = CacheStats::new();
        stats.record(CacheEvent::Miss);

        let snap = stats.snapshot(42);
        assert_eq!(snap.total_entries, 42);
        assert_eq!(snap.misses, 1);
        assert_eq!(stats.total_entries, 0);
    }
}
