//! Admission control for outbound fetches.
//!
//! A thin wrapper over `tokio::sync::Semaphore`, which queues waiters
//! in FIFO order and hands a released permit directly to the oldest
//! waiter. The gate bounds how many remote fetches run at once no
//! matter how many links a batch contains.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate with a fixed number of fetch slots.
pub struct FetchGate {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// RAII slot handle; the slot is released when this drops.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FetchGate {
    /// Create a gate with the given number of concurrent slots.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            max_concurrent: max_concurrent.max(1),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot.
    ///
    /// Suspends until one of the `max_concurrent` slots frees up;
    /// waiters are served in arrival order.
    pub async fn acquire(&self) -> GatePermit {
        let permit = loop {
            if let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await {
                break permit;
            }
            // Closed semaphores only result from close(), which we
            // never call; log and keep trying rather than poisoning
            // every caller.
            log::error!("fetch gate semaphore closed unexpectedly, retrying");
        };

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        GatePermit {
            _permit: permit,
            active: Arc::clone(&self.active),
        }
    }

    /// Number of fetches currently holding a slot.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders observed.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Configured slot count.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
