//! API Module
//!
//! HTTP handlers and routing for the proxy and diagnostics server.
//!
//! # Endpoints
//! - `ANY /proxy/*path` - Forward a request through the facade
//! - `GET /cache/:fingerprint` - Check whether a fingerprint is cached
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
