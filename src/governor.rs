// src/governor.rs
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Process-wide cap on simultaneous outbound requests
pub const MAX_CONCURRENT_REQUESTS: usize = 3;

/// Counting permit pool shared by every network, wallet, and chunk.
/// A permit is released when it is dropped, on success and on error alike.
#[derive(Debug, Clone)]
pub struct ConcurrencyGovernor {
    permits: Arc<Semaphore>,
}

impl Default for ConcurrencyGovernor {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_REQUESTS)
    }
}

impl ConcurrencyGovernor {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.permits).acquire_owned().await
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    #[cfg(test)]
    pub fn close(&self) {
        self.permits.close();
    }
}
