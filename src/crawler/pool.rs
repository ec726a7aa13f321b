//! Bounded fetch capacity shared by the listing and detail stages
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Live in-flight and peak counters for the run summary and tests
//!
//! A permit is held for exactly one fetch and released when dropped, so an
//! early return or failed request never leaks capacity.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounded pool of fetch slots
#[derive(Debug, Clone)]
pub struct FetchPool {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    /// Number of permits currently held
    in_flight: Arc<AtomicUsize>,

    /// Highest value `in_flight` has reached
    peak: Arc<AtomicUsize>,

    capacity: usize,
}

/// One fetch slot; dropping it returns the slot to the pool
#[derive(Debug)]
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FetchPool {
    /// Creates a pool with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// The semaphore is never closed, so the error arm is unreachable in
    /// practice.
    pub async fn acquire(&self) -> Result<PoolPermit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tracing::trace!("Fetch slot acquired ({}/{} in flight)", now, self.capacity);

        Ok(PoolPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most slots ever held at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
