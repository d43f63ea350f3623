//! Transport seam
//!
//! The facade never talks to the network itself: it hands a fully
//! intercepted `RequestConfig` to a `Transport` and gets a settled
//! `Response` back, whatever its status.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart;
use thiserror::Error;
use tracing::debug;

use crate::models::{Body, FormData, FormValue, Method, RequestConfig, Response, ResponseType};

// == Transport Error ==
/// Failure to obtain any response at all.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Connection failed: {0}")]
    Connection(String),
}

// == Transport Trait ==
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request. Any status, 2xx or not, is a settled response.
    async fn send(&self, config: &RequestConfig) -> Result<Response, TransportError>;

    /// The absolute URL `send` would target, query string included.
    fn resolve_url(&self, config: &RequestConfig) -> String;
}

// == HTTP Transport ==
/// reqwest-backed transport resolving relative URLs against a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn join(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.base_url.is_empty() {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, config: &RequestConfig) -> Result<Response, TransportError> {
        let url = reqwest::Url::parse(&self.join(&config.url))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let mut request = self
            .client
            .request(to_reqwest_method(config.method), url)
            .headers(to_header_map(&config.headers)?);
        if !config.params.is_empty() {
            request = request.query(&config.params);
        }
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }
        request = match &config.data {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Text(text) => request.body(text.clone()),
            Body::Bytes(bytes) => request.body(bytes.clone()),
            Body::Form(form) => request.multipart(to_multipart(form)?),
        };

        debug!(method = %config.method, url = %config.url, "sending request");
        let response = request.send().await?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let data = decode_body(response, config.response_type).await?;

        let mut settled = Response::new(status.as_u16(), data, config.clone())
            .with_status_text(status.canonical_reason().unwrap_or_default());
        settled.headers = headers;
        Ok(settled)
    }

    fn resolve_url(&self, config: &RequestConfig) -> String {
        let absolute = RequestConfig {
            url: self.join(&config.url),
            params: config.params.clone(),
            ..RequestConfig::default()
        };
        absolute.url_with_params()
    }
}

async fn decode_body(
    response: reqwest::Response,
    response_type: ResponseType,
) -> Result<Body, TransportError> {
    let body = match response_type {
        ResponseType::Bytes => {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                Body::Empty
            } else {
                Body::Bytes(bytes.to_vec())
            }
        }
        ResponseType::Text => {
            let text = response.text().await?;
            if text.is_empty() {
                Body::Empty
            } else {
                Body::Text(text)
            }
        }
        ResponseType::Json => {
            let text = response.text().await?;
            if text.is_empty() {
                Body::Empty
            } else {
                // Non-JSON payloads are kept as text
                match serde_json::from_str(&text) {
                    Ok(value) => Body::Json(value),
                    Err(_) => Body::Text(text),
                }
            }
        }
    };
    Ok(body)
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

fn to_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn to_multipart(form: &FormData) -> Result<multipart::Form, TransportError> {
    let mut multipart = multipart::Form::new();
    for (name, value) in form.parts() {
        multipart = match value {
            FormValue::Text(text) => multipart.text(name.clone(), text.clone()),
            FormValue::File {
                file_name,
                content,
                mime,
            } => {
                let mut part = multipart::Part::bytes(content.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    part = part.mime_str(mime)?;
                }
                multipart.part(name.clone(), part)
            }
        };
    }
    Ok(multipart)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_resolve_relative_url() {
        let transport = transport("http://api.test/v1/");
        let config = RequestConfig::new(Method::Get, "/users").with_param("page", "2");

        assert_eq!(transport.resolve_url(&config), "http://api.test/v1/users?page=2");
    }

    #[test]
    fn test_resolve_absolute_url_ignores_base() {
        let transport = transport("http://api.test");
        let config = RequestConfig::new(Method::Get, "https://other.test/x");

        assert_eq!(transport.resolve_url(&config), "https://other.test/x");
    }

    #[test]
    fn test_header_map_rejects_invalid_names() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "v".to_string());
        assert!(matches!(
            to_header_map(&headers),
            Err(TransportError::InvalidHeader(_))
        ));

        headers.clear();
        headers.insert("x-token".to_string(), "abc".to_string());
        assert_eq!(to_header_map(&headers).unwrap().len(), 1);
    }

    #[test]
    fn test_multipart_rejects_invalid_mime() {
        let form = FormData::new().file("avatar", "a.png", vec![1, 2, 3], Some("not a mime".to_string()));
        assert!(to_multipart(&form).is_err());

        let form = FormData::new()
            .text("name", "ada")
            .file("avatar", "a.png", vec![1, 2, 3], Some("image/png".to_string()));
        assert!(to_multipart(&form).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = transport("http://127.0.0.1:9");
        let config = RequestConfig::new(Method::Get, "/nothing");

        let result = transport.send(&config).await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
