//! Bounded retry with backoff
//!
//! One policy type serves both the document-store connection (open + liveness
//! probe per attempt) and the optional fetch retry.

use crate::config::{BackoffKind, StorageConfig};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Delay shape between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),
    /// `delay * attempt` after the n-th failure
    Linear(Duration),
}

/// Maximum attempts plus the backoff between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

/// Returned when every attempt failed
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy for store connections, built from `[storage]`
    pub fn from_storage(config: &StorageConfig) -> Self {
        let delay = Duration::from_millis(config.retry_delay_ms);
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed(delay),
            BackoffKind::Linear => Backoff::Linear(delay),
        };
        Self::new(config.retries, backoff)
    }

    /// Same backoff, different attempt bound
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(max_attempts, self.backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(delay) => delay.saturating_mul(attempt.max(1)),
        }
    }

    /// Runs `op` until it succeeds or the attempts are used up
    ///
    /// `op` receives the 1-based attempt number. No delay follows the final
    /// failure.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!(label, attempt, error = %e, "Final attempt failed");
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Like [`run`](Self::run) for a synchronous open step followed by a
    /// liveness probe; an attempt succeeds only if both do
    pub async fn run_probed<T, E, O, P>(
        &self,
        label: &str,
        mut open: O,
        probe: P,
    ) -> Result<T, RetryExhausted<E>>
    where
        O: FnMut(u32) -> Result<T, E>,
        P: Fn(&T) -> Result<(), E>,
        E: fmt::Display,
    {
        self.run(label, |attempt| {
            let outcome = open(attempt).and_then(|value| probe(&value).map(|()| value));
            std::future::ready(outcome)
        })
        .await
    }
}
