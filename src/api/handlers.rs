//! API Handlers
//!
//! HTTP request handlers for the diagnostics and proxy endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method as HttpMethod, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    Json,
};

use crate::client::RequestFacade;
use crate::config::Config;
use crate::error::{body_into_response, Result};
use crate::fingerprint::Fingerprint;
use crate::models::{
    Body, CacheLookupResponse, CacheMode, HealthResponse, Method, RequestConfig, StatsResponse,
};

/// Response header carrying the fingerprint of a proxied request.
pub const FINGERPRINT_HEADER: &str = "x-request-fingerprint";

/// Request headers never forwarded upstream. Upstream bodies are relayed
/// as decoded by the transport, which does not decompress, so
/// `accept-encoding` stays behind too.
const HOP_HEADERS: [&str; 5] = [
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "accept-encoding",
];

/// Methods the proxy forwards, as advertised in `Allow` on a 405.
const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<RequestFacade>,
}

impl AppState {
    pub fn new(facade: RequestFacade) -> Self {
        Self {
            facade: Arc::new(facade),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(RequestFacade::from_config(config)?))
    }
}

/// Handler for ANY /proxy/*path
///
/// Forwards the request through the facade. GET requests read through the
/// cache.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: HttpMethod,
    Path(path): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<HttpResponse> {
    let Ok(method) = method.as_str().parse::<Method>() else {
        return Ok((
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, ALLOWED_METHODS)],
        )
            .into_response());
    };

    let mut config = RequestConfig::new(method, format!("/{}", path));
    config.params = params;
    config.data = request_body(&headers, body);
    for (name, value) in &headers {
        if HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            config
                .headers
                .insert(name.as_str().to_string(), value.to_string());
        }
    }
    if method == Method::Get {
        config.cache = CacheMode::ReadThrough;
    }

    let fingerprint = Fingerprint::of(&config);
    let response = state.facade.request(config).await?;

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let content_type = response
        .headers
        .get(header::CONTENT_TYPE.as_str())
        .and_then(|v| HeaderValue::from_str(v).ok());
    let mut http_response = (status, body_into_response(response.data)).into_response();
    if let Some(content_type) = content_type {
        http_response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    if let Ok(value) = HeaderValue::from_str(fingerprint.as_str()) {
        http_response.headers_mut().insert(FINGERPRINT_HEADER, value);
    }
    Ok(http_response)
}

/// Handler for GET /cache/:fingerprint
///
/// Reports whether a fingerprint is currently cached and for how long.
/// Does not touch recency.
pub async fn cache_lookup_handler(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Json<CacheLookupResponse> {
    let ttl = state
        .facade
        .cache()
        .and_then(|cache| cache.ttl_remaining(&fingerprint));

    Json(CacheLookupResponse::new(fingerprint, ttl))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.facade.cache().map(|cache| cache.stats());
    Json(StatsResponse::new(stats, state.facade.pending().len()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// JSON bodies are parsed so they fingerprint structurally; anything else is
/// forwarded as raw bytes.
fn request_body(headers: &HeaderMap, body: Bytes) -> Body {
    if body.is_empty() {
        return Body::Empty;
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));
    if is_json {
        if let Ok(value) = serde_json::from_slice(&body) {
            return Body::Json(value);
        }
    }
    Body::Bytes(body.to_vec())
}
