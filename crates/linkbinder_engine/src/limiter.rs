use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore bounding simultaneous extraction operations.
///
/// Waiters are admitted in FIFO order; releasing a permit hands it directly
/// to the head of the queue rather than returning it to the free pool, so a
/// queued waiter is never starved by a later arrival.
#[derive(Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
}

impl Limiter {
    /// Creates a limiter with `permits` slots. A zero count is clamped to one
    /// so the limiter can never deadlock every caller.
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits.max(1))),
        }
    }

    /// Waits until a permit is free. The permit returns to the limiter when
    /// the guard is dropped. The limiter carries no timeout of its own;
    /// callers layer timeouts externally.
    pub async fn acquire(&self) -> Permit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore is never closed");
        Permit { _permit: permit }
    }

    /// Currently free permit count.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// RAII guard for one acquired permit.
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}
