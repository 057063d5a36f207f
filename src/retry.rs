//! Exponential backoff around remote store calls.
//!
//! Backoff sleeps race the caller's cancellation token, so a cancelled
//! search never sits out a retry delay.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::errors::FollowPathError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed()
    }
}

impl RetryPolicy {
    /// Three attempts with waits of 1s, 2s, 4s.
    pub fn fixed() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(4),
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
            max_backoff: Duration::ZERO,
        }
    }

    /// Backoff slept after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn validate(&self) -> Result<(), FollowPathError> {
        if self.max_attempts == 0 {
            return Err(FollowPathError::invalid_input(
                "retry.max_attempts must be at least 1",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(FollowPathError::invalid_input(format!(
                "retry.multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(FollowPathError::invalid_input(
                "retry.initial_backoff must not exceed retry.max_backoff",
            ));
        }
        Ok(())
    }

    /// Delays slept when every attempt fails.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1))
            .map(|attempt| self.delay_after(attempt))
            .collect()
    }
}

#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub value: Result<T, FollowPathError>,
    pub attempts: u32,
    /// Total time spent in backoff sleeps.
    pub waited: Duration,
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts run out. Cancellation wins over both the call and the
/// backoff sleep.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    cancel: &CancellationToken,
    mut f: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FollowPathError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut waited = Duration::ZERO;
    loop {
        if cancel.is_cancelled() {
            return RetryOutcome {
                value: Err(FollowPathError::cancelled(operation)),
                attempts: attempt - 1,
                waited,
            };
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FollowPathError::cancelled(operation)),
            result = f() => result,
        };
        match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "store call succeeded after retry");
                }
                return RetryOutcome {
                    value: Ok(value),
                    attempts: attempt,
                    waited,
                };
            }
            Err(err) if !err.is_retryable() => {
                return RetryOutcome {
                    value: Err(err),
                    attempts: attempt,
                    waited,
                };
            }
            Err(err) if attempt >= max_attempts => {
                error!(operation, attempts = attempt, error = %err, "store call failed after retries");
                return RetryOutcome {
                    value: Err(FollowPathError::store_unavailable(format!(
                        "{operation} failed after {attempt} attempts: {err}"
                    ))),
                    attempts: attempt,
                    waited,
                };
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %err,
                    backoff_ms = delay.as_millis() as u64,
                    "store call failed, retrying"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return RetryOutcome {
                            value: Err(FollowPathError::cancelled(operation)),
                            attempts: attempt,
                            waited,
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
                waited += delay;
                attempt += 1;
            }
        }
    }
}
