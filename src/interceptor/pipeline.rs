//! Interceptor Pipeline
//!
//! Two independent chains of tagged callbacks, one run on the outgoing
//! request and one on the settled response. A chain runs the callbacks of a
//! single tag, strictly in registration order, each one receiving what the
//! previous one produced.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::error::{RequestError, Result};
use crate::interceptor::RequestType;
use crate::models::{RequestConfig, Response};

// == Callback Types ==
/// Request-side callback. Mutates the request in place.
pub type RequestCallback = Arc<dyn Fn(&mut RequestConfig) -> anyhow::Result<()> + Send + Sync>;

/// Future produced by an asynchronous response callback.
pub type ResponseFuture = BoxFuture<'static, anyhow::Result<Response>>;

/// URL predicate; `true` bypasses a whole chain.
pub type Skipper = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Response-side callback, either immediate or asynchronous.
#[derive(Clone)]
pub enum ResponseCallback {
    Immediate(Arc<dyn Fn(Response) -> anyhow::Result<Response> + Send + Sync>),
    Deferred(Arc<dyn Fn(Response) -> ResponseFuture + Send + Sync>),
}

impl ResponseCallback {
    fn same_as(&self, other: &ResponseCallback) -> bool {
        match (self, other) {
            (ResponseCallback::Immediate(a), ResponseCallback::Immediate(b)) => same_callback(a, b),
            (ResponseCallback::Deferred(a), ResponseCallback::Deferred(b)) => same_callback(a, b),
            _ => false,
        }
    }
}

/// Closures have no identity of their own; two handles name the same
/// callback when they share the allocation.
fn same_callback<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

// == Interceptors ==
/// A request callback and, optionally, the tag it belongs to.
///
/// An untagged interceptor joins the pipeline's base tag. Keep a clone of
/// the interceptor to remove it later.
#[derive(Clone)]
pub struct RequestInterceptor {
    tag: Option<RequestType>,
    callback: RequestCallback,
}

impl RequestInterceptor {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut RequestConfig) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            tag: None,
            callback: Arc::new(callback),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<RequestType>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn tag(&self) -> Option<&RequestType> {
        self.tag.as_ref()
    }
}

/// A response callback and, optionally, the tag it belongs to.
#[derive(Clone)]
pub struct ResponseInterceptor {
    tag: Option<RequestType>,
    callback: ResponseCallback,
}

impl ResponseInterceptor {
    /// Wraps a callback that produces its result immediately.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Response) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        Self {
            tag: None,
            callback: ResponseCallback::Immediate(Arc::new(callback)),
        }
    }

    /// Wraps a callback whose result resolves asynchronously.
    pub fn deferred<F, Fut>(callback: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        Self {
            tag: None,
            callback: ResponseCallback::Deferred(Arc::new(move |response| {
                callback(response).boxed()
            })),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<RequestType>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn tag(&self) -> Option<&RequestType> {
        self.tag.as_ref()
    }
}

#[derive(Clone)]
struct Entry<C> {
    tag: RequestType,
    callback: C,
}

// == Interceptor Pipeline ==
/// Request and response chains plus their skip predicates.
///
/// Cloning copies both sequences, so a clone can be reconfigured without
/// touching the original.
#[derive(Clone)]
pub struct InterceptorPipeline {
    base_type: RequestType,
    request: Vec<Entry<RequestCallback>>,
    response: Vec<Entry<ResponseCallback>>,
    request_skipper: Skipper,
    response_skipper: Skipper,
}

impl Default for InterceptorPipeline {
    fn default() -> Self {
        Self::new(RequestType::Base)
    }
}

impl InterceptorPipeline {
    /// Creates an empty pipeline; untagged interceptors join `base_type`.
    pub fn new(base_type: RequestType) -> Self {
        Self {
            base_type,
            request: Vec::new(),
            response: Vec::new(),
            request_skipper: Arc::new(|_: &str| false),
            response_skipper: Arc::new(|_: &str| false),
        }
    }

    pub fn base_type(&self) -> &RequestType {
        &self.base_type
    }

    // == Registration ==
    pub fn add_request(&mut self, interceptor: RequestInterceptor) {
        let tag = interceptor.tag.unwrap_or_else(|| self.base_type.clone());
        self.request.push(Entry {
            tag,
            callback: interceptor.callback,
        });
    }

    pub fn add_response(&mut self, interceptor: ResponseInterceptor) {
        let tag = interceptor.tag.unwrap_or_else(|| self.base_type.clone());
        self.response.push(Entry {
            tag,
            callback: interceptor.callback,
        });
    }

    // == Removal ==
    /// Removes the first registration of this interceptor.
    ///
    /// An untagged interceptor matches on its callback alone; a tagged one
    /// must match on tag and callback. Returns whether anything was removed.
    pub fn remove_request(&mut self, interceptor: &RequestInterceptor) -> bool {
        let position = self.request.iter().position(|entry| {
            same_callback(&entry.callback, &interceptor.callback)
                && interceptor.tag.as_ref().map_or(true, |tag| *tag == entry.tag)
        });
        match position {
            Some(index) => {
                self.request.remove(index);
                true
            }
            None => false,
        }
    }

    /// Response-side counterpart of `remove_request`.
    pub fn remove_response(&mut self, interceptor: &ResponseInterceptor) -> bool {
        let position = self.response.iter().position(|entry| {
            entry.callback.same_as(&interceptor.callback)
                && interceptor.tag.as_ref().map_or(true, |tag| *tag == entry.tag)
        });
        match position {
            Some(index) => {
                self.response.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops every request interceptor of `tag`, or all of them.
    pub fn clear_request(&mut self, tag: Option<&RequestType>) {
        match tag {
            Some(tag) => self.request.retain(|entry| entry.tag != *tag),
            None => self.request.clear(),
        }
    }

    /// Drops every response interceptor of `tag`, or all of them.
    pub fn clear_response(&mut self, tag: Option<&RequestType>) {
        match tag {
            Some(tag) => self.response.retain(|entry| entry.tag != *tag),
            None => self.response.clear(),
        }
    }

    // == Skippers ==
    pub fn set_request_skipper<F>(&mut self, skipper: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.request_skipper = Arc::new(skipper);
    }

    pub fn set_response_skipper<F>(&mut self, skipper: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.response_skipper = Arc::new(skipper);
    }

    pub fn request_len(&self) -> usize {
        self.request.len()
    }

    pub fn response_len(&self) -> usize {
        self.response.len()
    }

    // == Run ==
    /// Runs the request chain of `tag` over `config`.
    ///
    /// On failure the error is a `runtime` error carrying the callback's
    /// error as its cause; changes made by earlier callbacks stay on
    /// `config`.
    pub fn do_request(&self, config: &mut RequestConfig, tag: &RequestType) -> Result<()> {
        if !config.url.is_empty() && (self.request_skipper)(&config.url) {
            debug!(url = %config.url, "request interceptors skipped");
            return Ok(());
        }

        for entry in self.request.iter().filter(|entry| entry.tag == *tag) {
            (entry.callback)(config).map_err(|e| {
                RequestError::runtime_with_cause("request interceptor error", e)
            })?;
        }

        Ok(())
    }

    /// Runs the response chain of `tag` over `response`, awaiting each
    /// asynchronous callback before invoking the next.
    pub async fn do_response(&self, response: Response, tag: &RequestType) -> Result<Response> {
        let url = &response.config.url;
        if !url.is_empty() && (self.response_skipper)(url) {
            debug!(url = %url, "response interceptors skipped");
            return Ok(response);
        }

        let chain: Vec<ResponseCallback> = self
            .response
            .iter()
            .filter(|entry| entry.tag == *tag)
            .map(|entry| entry.callback.clone())
            .collect();

        let mut current = response;
        for callback in chain {
            let next = match callback {
                ResponseCallback::Immediate(f) => f(current),
                ResponseCallback::Deferred(f) => f(current).await,
            };
            current = next.map_err(|e| {
                let message = match e.to_string() {
                    m if m.is_empty() => "response interceptor error".to_string(),
                    m => m,
                };
                RequestError::runtime_with_cause(message, e)
            })?;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Body, Method};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn append_header(value: &'static str) -> RequestInterceptor {
        RequestInterceptor::new(move |config: &mut RequestConfig| {
            let trail = config.headers.entry("x-trail".into()).or_default();
            trail.push_str(value);
            Ok(())
        })
    }

    fn response_for(url: &str) -> Response {
        Response::new(200, Body::Text(String::new()), RequestConfig::new(Method::Get, url))
    }

    fn append_text(value: &'static str) -> ResponseInterceptor {
        ResponseInterceptor::new(move |mut response: Response| {
            if let Body::Text(text) = &mut response.data {
                text.push_str(value);
            }
            Ok(response)
        })
    }

    #[test]
    fn test_request_chain_runs_in_registration_order() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_request(append_header("1"));
        pipeline.add_request(append_header("2"));
        pipeline.add_request(append_header("3"));

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline.do_request(&mut config, &RequestType::Base).unwrap();

        assert_eq!(config.headers["x-trail"], "123");
    }

    #[test]
    fn test_request_chain_filters_by_tag() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_request(append_header("b"));
        pipeline.add_request(append_header("j").with_tag("json"));
        pipeline.add_request(append_header("c").with_tag("metrics"));

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline.do_request(&mut config, &RequestType::Json).unwrap();
        assert_eq!(config.headers["x-trail"], "j");

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline
            .do_request(&mut config, &RequestType::from("metrics"))
            .unwrap();
        assert_eq!(config.headers["x-trail"], "c");

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline.do_request(&mut config, &RequestType::Upload).unwrap();
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_untagged_interceptor_joins_base_type() {
        let mut pipeline = InterceptorPipeline::new(RequestType::Json);
        pipeline.add_request(append_header("x"));

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline.do_request(&mut config, &RequestType::Base).unwrap();
        assert!(config.headers.is_empty());

        pipeline.do_request(&mut config, &RequestType::Json).unwrap();
        assert_eq!(config.headers["x-trail"], "x");
    }

    #[test]
    fn test_request_skipper_bypasses_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_request(RequestInterceptor::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        pipeline.set_request_skipper(|url| url.starts_with("/static"));

        let mut config = RequestConfig::new(Method::Get, "/static/app.js");
        pipeline.do_request(&mut config, &RequestType::Base).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut config = RequestConfig::new(Method::Get, "/api/posts");
        pipeline.do_request(&mut config, &RequestType::Base).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_failure_keeps_earlier_mutations() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_request(append_header("1"));
        pipeline.add_request(RequestInterceptor::new(|_| {
            Err(anyhow::anyhow!("token expired"))
        }));
        pipeline.add_request(append_header("3"));

        let mut config = RequestConfig::new(Method::Get, "/posts");
        let err = pipeline
            .do_request(&mut config, &RequestType::Base)
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::Runtime));
        assert_eq!(err.to_string(), "request interceptor error");
        assert_eq!(err.cause().unwrap().to_string(), "token expired");
        assert_eq!(config.headers["x-trail"], "1");
    }

    #[test]
    fn test_remove_untagged_matches_callback_only() {
        let mut pipeline = InterceptorPipeline::default();
        let first = append_header("1");
        let tagged = first.clone().with_tag("json");
        pipeline.add_request(tagged);
        pipeline.add_request(first.clone());
        pipeline.add_request(append_header("2"));

        // First registration sharing the callback goes, whatever its tag
        assert!(pipeline.remove_request(&first));
        assert_eq!(pipeline.request_len(), 2);

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline.do_request(&mut config, &RequestType::Json).unwrap();
        assert!(config.headers.is_empty());

        let mut config = RequestConfig::new(Method::Get, "/posts");
        pipeline.do_request(&mut config, &RequestType::Base).unwrap();
        assert_eq!(config.headers["x-trail"], "12");
    }

    #[test]
    fn test_remove_tagged_requires_matching_tag() {
        let mut pipeline = InterceptorPipeline::default();
        let interceptor = append_header("1");
        pipeline.add_request(interceptor.clone());

        assert!(!pipeline.remove_request(&interceptor.clone().with_tag("json")));
        assert_eq!(pipeline.request_len(), 1);
        assert!(pipeline.remove_request(&interceptor.clone().with_tag("base")));
        assert_eq!(pipeline.request_len(), 0);
        assert!(!pipeline.remove_request(&interceptor));
    }

    #[test]
    fn test_clear_by_tag_and_all() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_request(append_header("1"));
        pipeline.add_request(append_header("2").with_tag("json"));
        pipeline.add_response(append_text("a").with_tag("json"));
        pipeline.add_response(append_text("b"));

        pipeline.clear_request(Some(&RequestType::Json));
        pipeline.clear_response(Some(&RequestType::Json));
        assert_eq!(pipeline.request_len(), 1);
        assert_eq!(pipeline.response_len(), 1);

        pipeline.clear_request(None);
        pipeline.clear_response(None);
        assert_eq!(pipeline.request_len(), 0);
        assert_eq!(pipeline.response_len(), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = InterceptorPipeline::default();
        original.add_request(append_header("1"));

        let mut copy = original.clone();
        copy.add_request(append_header("2"));
        copy.set_request_skipper(|_| true);

        let mut config = RequestConfig::new(Method::Get, "/posts");
        original.do_request(&mut config, &RequestType::Base).unwrap();
        assert_eq!(config.headers["x-trail"], "1");
        assert_eq!(original.request_len(), 1);
        assert_eq!(copy.request_len(), 2);
    }

    #[tokio::test]
    async fn test_response_chain_awaits_each_step_in_order() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_response(ResponseInterceptor::deferred(|mut response: Response| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if let Body::Text(text) = &mut response.data {
                text.push_str("slow,");
            }
            Ok::<_, anyhow::Error>(response)
        }));
        pipeline.add_response(append_text("fast"));

        let response = pipeline
            .do_response(response_for("/posts"), &RequestType::Base)
            .await
            .unwrap();

        assert_eq!(response.data, Body::Text("slow,fast".into()));
    }

    #[tokio::test]
    async fn test_response_skipper_returns_input_unchanged() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_response(append_text("changed"));
        pipeline.set_response_skipper(|url| url == "/raw");

        let response = pipeline
            .do_response(response_for("/raw"), &RequestType::Base)
            .await
            .unwrap();
        assert_eq!(response.data, Body::Text(String::new()));
    }

    #[tokio::test]
    async fn test_response_failure_is_runtime_with_cause() {
        let mut pipeline = InterceptorPipeline::default();
        pipeline.add_response(ResponseInterceptor::deferred(|_response: Response| async {
            Err::<Response, _>(anyhow::anyhow!("unexpected payload"))
        }));

        let err = pipeline
            .do_response(response_for("/posts"), &RequestType::Base)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::Runtime));
        assert_eq!(err.to_string(), "unexpected payload");
        assert_eq!(err.cause().unwrap().to_string(), "unexpected payload");
    }

    #[tokio::test]
    async fn test_remove_response_interceptor() {
        let mut pipeline = InterceptorPipeline::default();
        let interceptor = append_text("x");
        pipeline.add_response(interceptor.clone());
        assert!(pipeline.remove_response(&interceptor));

        let response = pipeline
            .do_response(response_for("/posts"), &RequestType::Base)
            .await
            .unwrap();
        assert_eq!(response.data, Body::Text(String::new()));
    }

    #[test]
    fn test_body_json_untouched_without_interceptors() {
        let pipeline = InterceptorPipeline::default();
        let mut config = RequestConfig::new(Method::Post, "/posts").with_data(json!({"a": 1}));
        pipeline.do_request(&mut config, &RequestType::Base).unwrap();
        assert_eq!(config.data, Body::Json(json!({"a": 1})));
    }
}
