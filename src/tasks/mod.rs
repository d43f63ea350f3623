//! Background Tasks Module
//!
//! Contains the tasks spawned on behalf of the cache.
//!
//! # Tasks
//! - Expiry: one timer per cache entry, removing it once its max age elapses

mod expiry;

pub use expiry::{schedule_expiry, ExpiryTimer};
