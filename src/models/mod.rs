//! Request and Response models
//!
//! Domain types that flow through the facade, plus the DTOs used for
//! serializing the diagnostics API's response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{Body, CacheMode, FormData, FormValue, Method, RequestConfig, ResponseType};
pub use responses::{
    CacheLookupResponse, ErrorResponse, HealthResponse, Response, StatsResponse,
};
