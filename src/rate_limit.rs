//! Minimum-interval gate for outbound wiki requests.
//!
//! A token bucket of size one: every caller is released at least
//! `1 / requests_per_second` after the previous caller was released. There is no
//! burst allowance.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct RateLimiter {
    requests_per_second: f64,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A non-positive or non-finite rate disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            requests_per_second,
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the calling task may issue its request.
    ///
    /// The lock is held only for the check-and-update; a task woken from its sleep
    /// re-checks, since another task may have been released in the meantime.
    pub async fn wait_if_needed(&self) {
        loop {
            match self.try_acquire() {
                None => return,
                Some(remaining) => {
                    tracing::trace!(
                        wait_ms = remaining.as_millis() as u64,
                        "rate limiter sleeping"
                    );
                    tokio::time::sleep(remaining).await;
                }
            }
        }
    }

    /// Like [`wait_if_needed`](Self::wait_if_needed) but gives up when `cancel` fires.
    /// Returns `false` if cancelled before a slot was acquired.
    pub async fn wait_cancellable(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.wait_if_needed() => true,
        }
    }

    /// Claims the slot if the interval has elapsed, otherwise returns the time left.
    fn try_acquire(&self) -> Option<Duration> {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if let Some(prev) = *last {
            let elapsed = now.saturating_duration_since(prev);
            if elapsed < self.min_interval {
                return Some(self.min_interval - elapsed);
            }
        }

        *last = Some(now);
        None
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(5.0)
    }
}
