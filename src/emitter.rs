//! Notification channel
//!
//! Publishes the facade's two out-of-band events: `error` for categorized
//! failures and `warn` for duplicate in-flight requests.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::CancelHandle;
use crate::error::RequestError;
use crate::models::RequestConfig;

pub type ErrorListener = Arc<dyn Fn(&RequestError) + Send + Sync>;
pub type WarnListener = Arc<dyn Fn(&DuplicateRequest) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    Warn,
}

/// Payload of a `warn` event.
#[derive(Debug, Clone)]
pub struct DuplicateRequest {
    /// The request that was found already in flight
    pub config: RequestConfig,
    /// Aborts the newer attempt
    pub cancel: CancelHandle,
}

#[derive(Debug)]
pub enum Event<'a> {
    Error(&'a RequestError),
    Warn(&'a DuplicateRequest),
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Error(_) => EventKind::Error,
            Event::Warn(_) => EventKind::Warn,
        }
    }
}

#[derive(Default)]
struct Listeners {
    error: Vec<ErrorListener>,
    warn: Vec<WarnListener>,
}

// == Emitter ==
/// Listener registry. Clones share their listeners.
#[derive(Clone, Default)]
pub struct Emitter {
    listeners: Arc<RwLock<Listeners>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error<F>(&self, listener: F)
    where
        F: Fn(&RequestError) + Send + Sync + 'static,
    {
        self.write().error.push(Arc::new(listener));
    }

    pub fn on_warn<F>(&self, listener: F)
    where
        F: Fn(&DuplicateRequest) + Send + Sync + 'static,
    {
        self.write().warn.push(Arc::new(listener));
    }

    /// Calls every listener of the event's kind, in registration order.
    ///
    /// Listeners run outside the registry lock and may register more
    /// listeners; those see the next event.
    pub fn emit(&self, event: Event<'_>) {
        match event {
            Event::Error(error) => {
                let listeners = self.read_snapshot(|l| l.error.clone());
                for listener in listeners {
                    listener(error);
                }
            }
            Event::Warn(duplicate) => {
                let listeners = self.read_snapshot(|l| l.warn.clone());
                for listener in listeners {
                    listener(duplicate);
                }
            }
        }
    }

    /// Drops the listeners of one kind, or all of them.
    pub fn clear(&self, kind: Option<EventKind>) {
        let mut listeners = self.write();
        match kind {
            Some(EventKind::Error) => listeners.error.clear(),
            Some(EventKind::Warn) => listeners.warn.clear(),
            None => {
                listeners.error.clear();
                listeners.warn.clear();
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.read_snapshot(|l| match kind {
            EventKind::Error => l.error.len(),
            EventKind::Warn => l.warn.len(),
        })
    }

    fn read_snapshot<T>(&self, f: impl FnOnce(&Listeners) -> T) -> T {
        let guard = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Listeners> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("error_listeners", &self.listener_count(EventKind::Error))
            .field("warn_listeners", &self.listener_count(EventKind::Warn))
            .finish()
    }
}
