//! Response models
//!
//! The settled result of a transport call, plus the DTOs served by the
//! diagnostics API.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::{Body, RequestConfig};

// == Response ==
/// A settled HTTP response. This is also the value type held by the cache.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub data: Body,
    /// The request that produced this response, after request interceptors
    pub config: RequestConfig,
}

impl Response {
    pub fn new(status: u16, data: Body, config: RequestConfig) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: BTreeMap::new(),
            data,
            config,
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// == API DTOs ==

/// Response body for the cache lookup endpoint (GET /cache/:fingerprint)
#[derive(Debug, Clone, Serialize)]
pub struct CacheLookupResponse {
    pub fingerprint: String,
    pub cached: bool,
    /// Milliseconds until the entry expires, absent when not cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_remaining_ms: Option<u64>,
}

impl CacheLookupResponse {
    pub fn new(fingerprint: impl Into<String>, ttl_remaining: Option<Duration>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            cached: ttl_remaining.is_some(),
            ttl_remaining_ms: ttl_remaining
                .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of capacity evictions
    pub evictions: u64,
    /// Number of entries removed by age
    pub expirations: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Requests currently in flight
    pub pending_requests: usize,
}

impl StatsResponse {
    /// Builds the response from cache statistics (if caching is enabled) and
    /// the in-flight count.
    pub fn new(stats: Option<CacheStats>, pending_requests: usize) -> Self {
        let stats = stats.unwrap_or_default();
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            pending_requests,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error category (`network`, `runtime`, `node`) or `canceled`
    pub kind: String,
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            error: error.into(),
        }
    }
}
