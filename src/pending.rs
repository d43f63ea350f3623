//! In-flight request tracking
//!
//! Records which fingerprints have been dispatched and not yet settled, so a
//! second identical request can be reported as a duplicate.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::fingerprint::Fingerprint;

// == Pending Request Tracker ==
/// Set of fingerprints currently in flight.
///
/// Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct PendingRequestTracker {
    in_flight: Arc<Mutex<HashSet<Fingerprint>>>,
}

impl PendingRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Track ==
    /// Marks `fingerprint` as in flight.
    ///
    /// Check and insert happen under one lock. Returns `None` when the
    /// fingerprint is already in flight; the caller reports the duplicate and
    /// proceeds without a guard. The empty fingerprint is never tracked and
    /// never reported.
    pub fn track(&self, fingerprint: &Fingerprint) -> Option<PendingGuard> {
        if !fingerprint.is_cacheable() {
            return Some(PendingGuard {
                tracker: self.clone(),
                fingerprint: None,
            });
        }

        if !self.lock().insert(fingerprint.clone()) {
            debug!(fingerprint = %fingerprint, "request already in flight");
            return None;
        }

        Some(PendingGuard {
            tracker: self.clone(),
            fingerprint: Some(fingerprint.clone()),
        })
    }

    pub fn is_pending(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, fingerprint: &Fingerprint) {
        self.lock().remove(fingerprint);
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Fingerprint>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Pending Guard ==
/// Keeps a fingerprint in flight until dropped.
///
/// Dropping happens on every settlement path: success, error, cancellation
/// and the request future itself being dropped.
#[derive(Debug)]
#[must_use = "the request stops being tracked when the guard is dropped"]
pub struct PendingGuard {
    tracker: PendingRequestTracker,
    fingerprint: Option<Fingerprint>,
}

impl PendingGuard {
    /// The tracked fingerprint; `None` for an uncacheable request.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(fingerprint) = self.fingerprint.take() {
            self.tracker.release(&fingerprint);
        }
    }
}
