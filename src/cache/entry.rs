//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with an age bound.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A cached value and the moment it stops being servable.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion (or last refresh by `set`) plus max age
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry that expires `max_age` from now.
    pub fn new(value: V, max_age: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + max_age,
        }
    }

    // == Is Expired ==
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its deadline.
    ///
    /// The expiry timer normally removes the entry first; this check covers
    /// the window before the timer task runs, and stores used without a
    /// Tokio runtime.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
