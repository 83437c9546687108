//! Bounded retries with exponential backoff around a single request.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Classifies failures worth another attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for reqwest::Error {
    /// Timeouts and connection-level failures only. Status and decode errors are final.
    fn is_transient(&self) -> bool {
        self.is_timeout() || self.is_connect() || (self.is_request() && !self.is_builder())
    }
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// A non-transient failure, returned without retrying.
    Fatal(E),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_factor,
        }
    }

    /// Sleep after the zero-based `attempt` failed: `initial_delay * backoff_factor^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(0.0).powi(attempt as i32);
        self.initial_delay.mul_f64(factor)
    }

    /// Runs `op` until it succeeds, fails fatally, runs out of attempts, or `cancel` fires.
    ///
    /// `op` receives the zero-based attempt number. A pending attempt or backoff sleep is
    /// abandoned as soon as the token is cancelled.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Transient + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = op(attempt) => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(RetryError::Fatal(err)),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= attempts {
                tracing::error!(attempts, error = %err, "all attempts failed");
                return Err(RetryError::Exhausted { attempts, last: err });
            }

            let delay = self.delay_for(attempt - 1);
            tracing::warn!(
                attempt,
                max = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "request failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
