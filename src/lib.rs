//! request_cache - an HTTP request facade
//!
//! Wraps a transport with a fingerprint-keyed LRU/TTL result cache, tagged
//! request/response interceptor chains and in-flight duplicate detection.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod emitter;
pub mod error;
pub mod fingerprint;
pub mod interceptor;
pub mod models;
pub mod pending;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheStore;
pub use client::{CancelHandle, HttpTransport, RequestFacade, Transport, TransportError};
pub use config::{CacheConfig, Config};
pub use emitter::{DuplicateRequest, Emitter, Event, EventKind};
pub use error::{ErrorKind, RequestError, Result};
pub use fingerprint::Fingerprint;
pub use interceptor::{InterceptorPipeline, RequestInterceptor, RequestType, ResponseInterceptor};
pub use pending::PendingRequestTracker;
