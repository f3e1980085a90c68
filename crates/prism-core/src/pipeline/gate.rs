//! Counting admission gate bounding concurrent units of work.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admits at most a fixed number of simultaneous units.
///
/// The concurrency bound is a first-class object rather than an incidental
/// channel buffer size: stages acquire a permit before starting a unit and
/// the permit releases itself when dropped, so a unit cannot leak its slot on
/// any exit path, including early return and cancellation.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// A held admission slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` concurrent units.
    ///
    /// `capacity` must be at least 1; pipeline construction validates this
    /// before any gate is built.
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for an admission slot.
    ///
    /// Returns `None` only if the underlying semaphore has been closed,
    /// which the gate itself never does; callers treat it as "stop admitting".
    pub async fn admit(&self) -> Option<GatePermit> {
        match self.permits.clone().acquire_owned().await {
            Ok(permit) => Some(GatePermit { _permit: permit }),
            Err(_) => None,
        }
    }

    /// The configured concurrency bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
