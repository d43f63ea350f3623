//! Error types for the request facade
//!
//! Provides unified error handling using thiserror. Every failure a caller
//! can observe is a `RequestError`: one of the three categories `network`,
//! `runtime` and `node`, or the uncategorized cancellation error.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response as HttpResponse},
    Json,
};
use thiserror::Error;

use crate::models::{Body, ErrorResponse, RequestConfig, Response};

/// Boxed cause attached to a categorized error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Error Kind ==
/// Category of a `RequestError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport-level failure or non-2xx status
    Network,
    /// Pipeline callback failure or API misuse
    Runtime,
    /// Host-runtime failure (filesystem and the like)
    Node,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => f.write_str("network"),
            ErrorKind::Runtime => f.write_str("runtime"),
            ErrorKind::Node => f.write_str("node"),
        }
    }
}

// == Request Error Enum ==
/// Unified error type for the facade.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The transport failed or the upstream answered with a non-2xx status
    #[error("{message}")]
    Network {
        message: String,
        config: Box<RequestConfig>,
        response: Option<Box<Response>>,
        #[source]
        cause: Option<BoxError>,
    },

    /// An interceptor failed, or the facade was misused
    #[error("{message}")]
    Runtime {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// A failure of the host runtime
    #[error("{message}")]
    Node {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The request was canceled through its cancel handle
    #[error("request canceled")]
    Canceled,
}

impl RequestError {
    pub fn runtime(message: impl Into<String>) -> Self {
        RequestError::Runtime {
            message: message.into(),
            cause: None,
        }
    }

    pub fn runtime_with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        RequestError::Runtime {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn node_with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        RequestError::Node {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Transport failure before any response arrived.
    pub fn network(config: RequestConfig, cause: impl Into<BoxError>) -> Self {
        RequestError::Network {
            message: "network error".to_string(),
            config: Box::new(config),
            response: None,
            cause: Some(cause.into()),
        }
    }

    /// The upstream answered, but not with a 2xx status.
    pub fn bad_status(response: Response) -> Self {
        RequestError::Network {
            message: format!("request failed with status code {}", response.status),
            config: Box::new(response.config.clone()),
            response: Some(Box::new(response)),
            cause: None,
        }
    }

    /// Category, or `None` for cancellation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RequestError::Network { .. } => Some(ErrorKind::Network),
            RequestError::Runtime { .. } => Some(ErrorKind::Runtime),
            RequestError::Node { .. } => Some(ErrorKind::Node),
            RequestError::Canceled => None,
        }
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            RequestError::Network { cause, .. }
            | RequestError::Runtime { cause, .. }
            | RequestError::Node { cause, .. } => cause.as_deref(),
            RequestError::Canceled => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, RequestError::Canceled)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for RequestError {
    fn into_response(self) -> HttpResponse {
        // Upstream answered: relay its status and payload unchanged.
        if let RequestError::Network {
            response: Some(response),
            ..
        } = &self
        {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            return (status, body_into_response(response.data.clone())).into_response();
        }

        let kind = self
            .kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "canceled".to_string());
        let status = match self.kind() {
            Some(ErrorKind::Network) => StatusCode::BAD_GATEWAY,
            Some(ErrorKind::Runtime) | Some(ErrorKind::Node) => StatusCode::INTERNAL_SERVER_ERROR,
            // 499: client closed request
            None => StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
        };

        (status, Json(ErrorResponse::new(kind, self.to_string()))).into_response()
    }
}

/// Renders a facade body as an axum response body.
pub(crate) fn body_into_response(body: Body) -> HttpResponse {
    match body {
        Body::Empty => ().into_response(),
        Body::Json(value) => Json(value).into_response(),
        Body::Text(text) => text.into_response(),
        Body::Bytes(bytes) => bytes.into_response(),
        Body::Form(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response(),
    }
}

// == Result Type Alias ==
/// Convenience Result type for the facade.
pub type Result<T> = std::result::Result<T, RequestError>;
