//! Cache Module
//!
//! Provides the fingerprint cache: capacity-bounded LRU eviction combined
//! with per-entry age expiry.

mod entry;
mod eviction;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use eviction::{EvictionList, NodeId};
pub use stats::{CacheEvent, CacheStats};
pub use store::CacheStore;
