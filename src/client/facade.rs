//! Request Facade
//!
//! Orchestrates one request: fingerprint, cache lookup, duplicate detection,
//! request interceptors, transport, response interceptors, cache update.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, warn};

use crate::cache::CacheStore;
use crate::client::{CancelHandle, HttpTransport, Transport};
use crate::config::{CacheConfig, Config};
use crate::emitter::{DuplicateRequest, Emitter, Event};
use crate::error::{RequestError, Result};
use crate::fingerprint::Fingerprint;
use crate::interceptor::{InterceptorPipeline, RequestInterceptor, RequestType, ResponseInterceptor};
use crate::models::{Body, CacheMode, Method, RequestConfig, Response};
use crate::pending::PendingRequestTracker;

// == Request Facade ==
/// HTTP client wrapper adding a fingerprint cache, interceptor chains and
/// duplicate detection around a `Transport`.
///
/// All methods take `&self`; share a facade behind an `Arc`.
pub struct RequestFacade {
    transport: Arc<dyn Transport>,
    pipeline: RwLock<InterceptorPipeline>,
    cache: Option<CacheStore<Response>>,
    pending: PendingRequestTracker,
    emitter: Emitter,
}

impl RequestFacade {
    // == Constructors ==
    /// A facade without a cache, using `base` as its default tag.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pipeline: RwLock::new(InterceptorPipeline::default()),
            cache: None,
            pending: PendingRequestTracker::new(),
            emitter: Emitter::new(),
        }
    }

    /// Enables the result cache.
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(CacheStore::new(config));
        self
    }

    /// Tag applied to requests and interceptors that name none.
    ///
    /// Replaces the pipeline, so call it before registering interceptors.
    pub fn with_base_request_type(self, base_type: impl Into<RequestType>) -> Self {
        Self {
            pipeline: RwLock::new(InterceptorPipeline::new(base_type.into())),
            ..self
        }
    }

    /// Builds a reqwest-backed facade from the server configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.upstream_url.clone(), config.request_timeout())
            .map_err(|e| RequestError::runtime_with_cause("failed to build HTTP client", e))?;

        Ok(Self::new(Arc::new(transport))
            .with_base_request_type(config.base_request_type.as_str())
            .with_cache(config.cache_config()?))
    }

    /// A new facade over the same transport, starting from a copy of this
    /// one's interceptors and skippers.
    ///
    /// The fork gets its own empty cache (same bounds), its own in-flight set
    /// and no listeners. Interceptor changes on either side never reach the
    /// other.
    pub fn fork(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            pipeline: RwLock::new(self.pipeline_snapshot()),
            cache: self.cache.as_ref().map(|c| CacheStore::new(c.config())),
            pending: PendingRequestTracker::new(),
            emitter: Emitter::new(),
        }
    }

    // == Request ==
    /// Issues one request through cache, interceptors and transport.
    ///
    /// Only 2xx responses settle successfully; anything else is a `network`
    /// error carrying the response. Cancellation through the request's
    /// `CancelHandle` yields `RequestError::Canceled`.
    pub async fn request(&self, mut config: RequestConfig) -> Result<Response> {
        let pipeline = self.pipeline_snapshot();
        let tag = config
            .request_type
            .get_or_insert_with(|| pipeline.base_type().clone())
            .clone();
        let cancel = config.cancel.get_or_insert_with(CancelHandle::new).clone();
        let cache_mode = config.cache;
        let fingerprint = Fingerprint::of(&config);

        if let Some(cache) = self.cache.as_ref().filter(|_| fingerprint.is_cacheable()) {
            match cache_mode {
                CacheMode::ReadThrough => {
                    if let Some(hit) = cache.get(fingerprint.as_str()) {
                        debug!(fingerprint = %fingerprint, url = %config.url, "cache hit");
                        return Ok(hit);
                    }
                }
                CacheMode::Invalidate => {
                    cache.delete(fingerprint.as_str());
                }
                CacheMode::Bypass => {}
            }
        }

        let guard = self.pending.track(&fingerprint);
        if guard.is_none() {
            warn!(method = %config.method, url = %config.url, "duplicate request in flight");
            self.emitter.emit(Event::Warn(&DuplicateRequest {
                config: config.clone(),
                cancel: cancel.clone(),
            }));
        }
        if cancel.is_canceled() {
            return Err(RequestError::Canceled);
        }

        if let Err(e) = pipeline.do_request(&mut config, &tag) {
            error!(url = %config.url, error = ?e, "request interceptor failed");
            return Err(self.publish(e));
        }

        let sent = tokio::select! {
            biased;
            _ = cancel.canceled() => {
                debug!(url = %config.url, "request canceled");
                return Err(RequestError::Canceled);
            }
            sent = self.transport.send(&config) => sent,
        };
        drop(guard);

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                error!(url = %config.url, error = %e, "transport failed");
                return Err(self.publish(RequestError::network(config, e)));
            }
        };
        if !response.is_success() {
            debug!(url = %config.url, status = response.status, "unsuccessful status");
            return Err(self.publish(RequestError::bad_status(response)));
        }

        let response = match pipeline.do_response(response, &tag).await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %config.url, error = ?e, "response interceptor failed");
                return Err(self.publish(e));
            }
        };

        if cache_mode == CacheMode::ReadThrough && fingerprint.is_cacheable() {
            if let Some(cache) = &self.cache {
                cache.set(fingerprint.as_str(), response.clone());
                debug!(fingerprint = %fingerprint, "response cached");
            }
        }

        Ok(response)
    }

    // == Verb Helpers ==
    pub async fn get(&self, url: impl Into<String>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Get, url)).await
    }

    pub async fn delete(&self, url: impl Into<String>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Delete, url)).await
    }

    pub async fn head(&self, url: impl Into<String>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Head, url)).await
    }

    pub async fn options(&self, url: impl Into<String>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Options, url)).await
    }

    pub async fn post(&self, url: impl Into<String>, data: impl Into<Body>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Post, url).with_data(data))
            .await
    }

    pub async fn put(&self, url: impl Into<String>, data: impl Into<Body>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Put, url).with_data(data))
            .await
    }

    pub async fn patch(&self, url: impl Into<String>, data: impl Into<Body>) -> Result<Response> {
        self.request(RequestConfig::new(Method::Patch, url).with_data(data))
            .await
    }

    // == Upload ==
    /// POSTs multipart form data. Any other body is a `runtime` error and
    /// nothing is sent.
    pub async fn upload(&self, url: impl Into<String>, data: impl Into<Body>) -> Result<Response> {
        let data = data.into();
        if !matches!(data, Body::Form(_)) {
            return Err(RequestError::runtime("upload requires form data"));
        }
        self.request(RequestConfig::new(Method::Post, url).with_data(data))
            .await
    }

    // == Download ==
    /// Runs `config` and writes the payload to `path`.
    ///
    /// Accepts a binary or text response, or a JSON object whose `data`
    /// field is a string. Returns the number of bytes written.
    pub async fn download(&self, config: RequestConfig, path: impl AsRef<Path>) -> Result<usize> {
        let response = self.request(config).await?;
        let bytes = match response.data {
            Body::Bytes(bytes) => bytes,
            Body::Text(text) => text.into_bytes(),
            Body::Json(ref value) => match value.get("data").and_then(|d| d.as_str()) {
                Some(text) => text.as_bytes().to_vec(),
                None => return Err(unsupported_download()),
            },
            Body::Empty | Body::Form(_) => return Err(unsupported_download()),
        };

        let path = path.as_ref();
        tokio::fs::write(path, &bytes).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "download write failed");
            self.publish(RequestError::node_with_cause("failed to write downloaded file", e))
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "download written");
        Ok(bytes.len())
    }

    /// Absolute URL a request would target.
    pub fn get_uri(&self, config: &RequestConfig) -> String {
        self.transport.resolve_url(config)
    }

    // == Interceptors ==
    pub fn add_request_interceptor(&self, interceptor: RequestInterceptor) {
        self.pipeline_mut().add_request(interceptor);
    }

    pub fn add_response_interceptor(&self, interceptor: ResponseInterceptor) {
        self.pipeline_mut().add_response(interceptor);
    }

    pub fn remove_request_interceptor(&self, interceptor: &RequestInterceptor) -> bool {
        self.pipeline_mut().remove_request(interceptor)
    }

    pub fn remove_response_interceptor(&self, interceptor: &ResponseInterceptor) -> bool {
        self.pipeline_mut().remove_response(interceptor)
    }

    /// Clears one tag's request interceptors, or all of them.
    pub fn clear_request_interceptors(&self, tag: Option<&RequestType>) {
        self.pipeline_mut().clear_request(tag);
    }

    pub fn clear_response_interceptors(&self, tag: Option<&RequestType>) {
        self.pipeline_mut().clear_response(tag);
    }

    pub fn set_request_interceptor_skipper<F>(&self, skipper: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.pipeline_mut().set_request_skipper(skipper);
    }

    pub fn set_response_interceptor_skipper<F>(&self, skipper: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.pipeline_mut().set_response_skipper(skipper);
    }

    // == Events ==
    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&RequestError) + Send + Sync + 'static,
    {
        self.emitter.on_error(listener);
    }

    pub fn on_warn<F>(&self, listener: F)
    where
        F: Fn(&DuplicateRequest) + Send + Sync + 'static,
    {
        self.emitter.on_warn(listener);
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    // == Introspection ==
    /// The result cache, when enabled.
    pub fn cache(&self) -> Option<&CacheStore<Response>> {
        self.cache.as_ref()
    }

    pub fn pending(&self) -> &PendingRequestTracker {
        &self.pending
    }

    pub fn base_request_type(&self) -> RequestType {
        self.pipeline_snapshot().base_type().clone()
    }

    fn publish(&self, error: RequestError) -> RequestError {
        self.emitter.emit(Event::Error(&error));
        error
    }

    fn pipeline_snapshot(&self) -> InterceptorPipeline {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn pipeline_mut(&self) -> std::sync::RwLockWriteGuard<'_, InterceptorPipeline> {
        self.pipeline.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unsupported_download() -> RequestError {
    RequestError::runtime("download expects a binary, text or string data response")
}
