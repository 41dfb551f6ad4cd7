//! Bounded retry with backoff for actions that are safe to repeat

use crate::config::RetryPolicy;
use rewards_core::Error;
use std::future::Future;
use thiserror::Error as ThisError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Progress of a [`RetryableAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    /// Attempt `n` (1-based) is in flight or waiting to be retried
    Attempting(u32),
    Succeeded { attempts: u32 },
    ExhaustedFailed { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. }
                | RetryState::ExhaustedFailed { .. }
                | RetryState::Cancelled { .. }
        )
    }
}

/// Why a retried action gave up
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum RetryError {
    /// Every attempt failed; carries the last error unchanged
    #[error("{last_error}")]
    Exhausted { attempts: u32, last_error: Error },
    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// Runs an action until it succeeds, attempts run out, or the owner cancels.
///
/// Business rejections and transport failures both count as failed attempts.
/// Cancellation stops new attempts; an attempt already sent is allowed to
/// finish and its result is dropped.
pub struct RetryableAction {
    policy: RetryPolicy,
    cancel: CancellationToken,
    state: RetryState,
}

impl RetryableAction {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            cancel,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Run `action`, passing it the 1-based attempt number
    pub async fn run<T, F, Fut>(&mut self, mut action: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = rewards_core::Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let cancel = self.cancel.clone();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempt - 1));
            }

            self.state = RetryState::Attempting(attempt);
            let result = action(attempt).await;

            if cancel.is_cancelled() {
                debug!("Attempt {} finished after cancellation, discarding result", attempt);
                return Err(self.cancelled(attempt));
            }

            match result {
                Ok(value) => {
                    debug!("Succeeded on attempt {}/{}", attempt, max_attempts);
                    self.state = RetryState::Succeeded { attempts: attempt };
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts => {
                    warn!("Attempt {}/{} failed: {} - retrying", attempt, max_attempts, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    error!("Failed after {} attempts: {}", attempt, e);
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.delay_after(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(self.cancelled(attempt)),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.state = RetryState::ExhaustedFailed {
            attempts: max_attempts,
        };
        Err(RetryError::Exhausted {
            attempts: max_attempts,
            last_error: last_error
                .unwrap_or_else(|| Error::Unknown("No attempt was made".to_string())),
        })
    }

    fn cancelled(&mut self, attempts: u32) -> RetryError {
        self.state = RetryState::Cancelled { attempts };
        RetryError::Cancelled { attempts }
    }
}
