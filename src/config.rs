//! Configuration Module
//!
//! Handles loading the server configuration from environment variables, and
//! the validated cache bounds the facade is built with.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RequestError, Result};

// == Cache Config ==
/// Capacity and age bounds of a `CacheStore`. Both are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    max_length: usize,
    max_age: Duration,
}

impl CacheConfig {
    /// Validates the bounds; zero for either is a `runtime` error.
    pub fn new(max_length: usize, max_age: Duration) -> Result<Self> {
        if max_length == 0 {
            return Err(RequestError::runtime(
                "cache max length must be greater than zero",
            ));
        }
        if max_age.is_zero() {
            return Err(RequestError::runtime("cache max age must be greater than zero"));
        }
        Ok(Self {
            max_length,
            max_age,
        })
    }

    pub fn from_millis(max_length: usize, max_age_ms: u64) -> Result<Self> {
        Self::new(max_length, Duration::from_millis(max_age_ms))
    }

    /// Maximum number of entries
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Lifetime of an entry after its last `set`
    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL requests are forwarded to
    pub upstream_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of cached responses
    pub cache_max_length: usize,
    /// Lifetime of a cached response in milliseconds
    pub cache_max_age_ms: u64,
    /// Transport timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Interceptor tag used when a request names none
    pub base_request_type: String,
    /// Cancel the newer of two overlapping identical requests
    pub cancel_duplicates: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_URL` - Upstream base URL (default: http://localhost:8080)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_LENGTH` - Maximum cached responses (default: 1000)
    /// - `CACHE_MAX_AGE_MS` - Cached response lifetime (default: 300000)
    /// - `REQUEST_TIMEOUT_MS` - Transport timeout (default: 30000)
    /// - `BASE_REQUEST_TYPE` - Default interceptor tag (default: base)
    /// - `CANCEL_DUPLICATES` - Cancel overlapping duplicates (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            server_port: parse_env("SERVER_PORT", defaults.server_port),
            cache_max_length: parse_env("CACHE_MAX_LENGTH", defaults.cache_max_length),
            cache_max_age_ms: parse_env("CACHE_MAX_AGE_MS", defaults.cache_max_age_ms),
            request_timeout_ms: parse_env("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            base_request_type: env::var("BASE_REQUEST_TYPE")
                .unwrap_or(defaults.base_request_type),
            cancel_duplicates: parse_env("CANCEL_DUPLICATES", defaults.cancel_duplicates),
        }
    }

    /// Validated cache bounds.
    pub fn cache_config(&self) -> Result<CacheConfig> {
        CacheConfig::from_millis(self.cache_max_length, self.cache_max_age_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: "http://localhost:8080".to_string(),
            server_port: 3000,
            cache_max_length: 1000,
            cache_max_age_ms: 300_000,
            request_timeout_ms: 30_000,
            base_request_type: "base".to_string(),
            cancel_duplicates: false,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.upstream_url, "http://localhost:8080");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_max_length, 1000);
        assert_eq!(config.cache_max_age_ms, 300_000);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.base_request_type, "base");
        assert!(!config.cancel_duplicates);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("UPSTREAM_URL");
        env::remove_var("SERVER_PORT");
        env::remove_var("CACHE_MAX_LENGTH");
        env::remove_var("CACHE_MAX_AGE_MS");
        env::remove_var("REQUEST_TIMEOUT_MS");
        env::remove_var("BASE_REQUEST_TYPE");
        env::remove_var("CANCEL_DUPLICATES");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_max_length, 1000);
        assert_eq!(config.cache_max_age_ms, 300_000);
        assert!(!config.cancel_duplicates);
    }

    #[test]
    fn test_cache_config_validation() {
        let config = CacheConfig::from_millis(3, 500).unwrap();
        assert_eq!(config.max_length(), 3);
        assert_eq!(config.max_age(), Duration::from_millis(500));

        let err = CacheConfig::from_millis(0, 500).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Runtime));
        assert!(CacheConfig::from_millis(3, 0).is_err());
    }

    #[test]
    fn test_server_config_builds_cache_config() {
        let config = Config {
            cache_max_length: 0,
            ..Config::default()
        };
        assert!(config.cache_config().is_err());
        assert!(Config::default().cache_config().is_ok());
    }
}
