//! Request fingerprints
//!
//! A fingerprint is the SHA-256 of a request's method, target URL, query
//! parameters and serialized payload. Requests with equal fingerprints are interchangeable
//! for caching and duplicate detection.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::{Method, RequestConfig};

/// Separates the hashed fields. Never produced by a method name, a URL or
/// JSON text.
const FIELD_SEPARATOR: &[u8] = b"\x1f";

// == Fingerprint ==
/// Lowercase hex digest identifying a logical request.
///
/// The empty fingerprint marks a request that could not be hashed; it is
/// never cached nor tracked as in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The "uncacheable" fingerprint.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_cacheable(&self) -> bool {
        !self.0.is_empty()
    }

    /// Hashes `method`, `url` and `body`.
    ///
    /// Never fails: a body that cannot be serialized yields the empty
    /// fingerprint.
    pub fn compute<B>(method: Method, url: &str, body: &B) -> Self
    where
        B: Serialize + ?Sized,
    {
        Self::digest(method, url, &[], body)
    }

    /// Fingerprint of a request config.
    ///
    /// Query parameters are hashed as their own JSON field, so a value
    /// containing `&` or `=` cannot pose as extra parameters.
    pub fn of(config: &RequestConfig) -> Self {
        Self::digest(config.method, &config.url, &config.params, &config.data)
    }

    fn digest<B>(method: Method, url: &str, params: &[(String, String)], body: &B) -> Self
    where
        B: Serialize + ?Sized,
    {
        let hashed = serde_json::to_vec(params)
            .and_then(|params| serde_json::to_vec(body).map(|payload| (params, payload)));
        let (params, payload) = match hashed {
            Ok(fields) => fields,
            Err(e) => {
                warn!(%method, url, error = %e, "request body not hashable, caching disabled");
                return Self::empty();
            }
        };

        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(url.as_bytes());
        hasher.update(FIELD_SEPARATOR);
        hasher.update(&params);
        hasher.update(FIELD_SEPARATOR);
        hasher.update(&payload);

        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}
