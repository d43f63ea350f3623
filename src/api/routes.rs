//! API Routes
//!
//! Configures the Axum router with the proxy and diagnostics endpoints.

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_lookup_handler, health_handler, proxy_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `ANY /proxy/*path` - Forward a request through the facade
/// - `GET /cache/:fingerprint` - Check whether a fingerprint is cached
/// - `GET /stats` - Cache statistics and in-flight count
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/proxy/*path", any(proxy_handler))
        .route("/cache/:fingerprint", get(cache_lookup_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
