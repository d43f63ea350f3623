//! Expiry Timers
//!
//! One Tokio task per cache entry, sleeping for the entry's max age and
//! then running an eviction callback.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::debug;

// == Expiry Timer ==
/// Handle to a scheduled expiry.
///
/// Dropping the timer cancels the task. `generation` identifies this
/// particular scheduling, so a callback that was already running when its
/// timer got replaced can tell it is stale.
#[derive(Debug)]
pub struct ExpiryTimer {
    generation: u64,
    handle: Option<AbortHandle>,
}

impl ExpiryTimer {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a task backs this timer (false outside a Tokio runtime).
    pub fn is_scheduled(&self) -> bool {
        self.handle.is_some()
    }

    /// Releases the timer without aborting its task. Used from inside the
    /// task itself once it has fired.
    pub fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawns a task that runs `on_expire` after `delay`.
///
/// Outside a Tokio runtime nothing is spawned; the returned timer is inert
/// and expiry falls back to the entry deadline checked on access.
///
/// # Example
/// ```ignore
/// let timer = schedule_expiry(Duration::from_millis(500), 1, move || {
///     println!("expired");
/// });
/// // Replacing or dropping the timer cancels the pending task
/// drop(timer);
/// ```
pub fn schedule_expiry<F>(delay: Duration, generation: u64, on_expire: F) -> ExpiryTimer
where
    F: FnOnce() + Send + 'static,
{
    let handle = match Handle::try_current() {
        Ok(runtime) => {
            let task = runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                on_expire();
            });
            Some(task.abort_handle())
        }
        Err(_) => {
            debug!("no Tokio runtime, expiry checked lazily");
            None
        }
    };

    ExpiryTimer { generation, handle }
}
