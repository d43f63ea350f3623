//! Client Module
//!
//! The request facade and its collaborators: the transport seam and
//! cancellation handles.

mod cancel;
mod facade;
mod transport;

pub use cancel::CancelHandle;
pub use facade::RequestFacade;
pub use transport::{HttpTransport, Transport, TransportError};
