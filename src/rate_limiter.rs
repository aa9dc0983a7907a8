// src/rate_limiter.rs
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Minimum spacing between two requests to the same network
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

/// Per-network dispatch spacing.
///
/// Each caller reserves the next free dispatch slot (`last + interval`, or now if
/// that is already past) under the network's entry lock, then sleeps until the
/// slot outside the lock. Concurrent callers therefore get distinct slots spaced
/// by at least `interval`, while requests already dispatched may still overlap.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_dispatch: DashMap<String, Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MIN_REQUEST_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: DashMap::new(),
        }
    }

    /// Wait for this network's next dispatch slot and record it
    pub async fn wait(&self, network: &str) {
        let slot = self.reserve(network);
        if slot > Instant::now() {
            sleep_until(slot).await;
        }
    }

    fn reserve(&self, network: &str) -> Instant {
        let now = Instant::now();
        match self.last_dispatch.entry(network.to_string()) {
            Entry::Occupied(mut last) => {
                let slot = (*last.get() + self.interval).max(now);
                last.insert(slot);
                slot
            }
            Entry::Vacant(empty) => {
                empty.insert(now);
                now
            }
        }
    }
}
