//! Rewards Engine - Payout submission, claims, spins and state reconciliation

pub mod config;
pub mod executor;
pub mod ledger;
pub mod manager;
pub mod poller;
pub mod policy;
pub mod reconcile;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::{ManagerConfig, RetryPolicy};
pub use executor::{IdempotentSubmitter, RetryError, RetryState, RetryableAction};
pub use ledger::ClaimLedger;
pub use manager::{PayoutSession, RewardsManager};
pub use poller::AutoRefreshHandle;
pub use reconcile::{ActionKind, StateReconciler};
pub use validation::PayoutValidator;
