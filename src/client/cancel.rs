//! Cancellation handles
//!
//! A `CancelHandle` is a cloneable, zero-argument switch: any clone may call
//! `cancel`, and the request holding another clone stops waiting on its
//! transport.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Default)]
struct CancelState {
    canceled: AtomicBool,
    notify: Notify,
}

// == Cancel Handle ==
#[derive(Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the request. Idempotent.
    pub fn cancel(&self) {
        if !self.state.canceled.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.state.canceled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn canceled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let handle = CancelHandle::new();
        let other = handle.clone();
        assert!(!other.is_canceled());

        handle.cancel();
        handle.cancel();
        assert!(other.is_canceled());
    }

    #[tokio::test]
    async fn test_canceled_wakes_waiter() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.canceled().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        handle.cancel();
        tokio::time::timeout(Duration::from_millis(200), task)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_canceled_returns_immediately_when_already_canceled() {
        let handle = CancelHandle::new();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(50), handle.canceled())
            .await
            .unwrap();
    }
}
