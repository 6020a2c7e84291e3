//! Shared request pacing
//!
//! A token-interval gate: each `acquire` claims the next send slot and waits
//! until it arrives, so concurrent workers collectively never exceed one
//! outbound request per configured interval. The slot is claimed under the
//! lock but the wait happens outside it, so no lock is held across a
//! suspension point that could overlap a network call.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval gate for outbound API requests
pub struct RequestPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Creates a pacer enforcing one request per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until the caller may send the next request
    pub async fn acquire(&self) {
        let wait = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let ready = match *slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *slot = Some(ready + self.interval);
            ready.duration_since(now)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
