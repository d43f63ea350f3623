//! Interceptor Module
//!
//! Tagged request/response transformation chains with per-URL skip
//! predicates.

mod pipeline;
mod tag;

pub use pipeline::{
    InterceptorPipeline, RequestCallback, RequestInterceptor, ResponseCallback,
    ResponseFuture, ResponseInterceptor, Skipper,
};
pub use tag::RequestType;
