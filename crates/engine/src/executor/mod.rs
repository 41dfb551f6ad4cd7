//! Request execution: single-flight submission and bounded retry

mod retry;
mod submitter;

pub use retry::{RetryError, RetryState, RetryableAction};
pub use submitter::{IdempotentSubmitter, BUSY_MESSAGE};
