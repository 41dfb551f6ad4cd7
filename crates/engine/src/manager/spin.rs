//! Spin-wheel: retried spin, then redeem of a pending reward

use super::RewardsManager;
use crate::executor::{RetryError, RetryableAction, BUSY_MESSAGE};
use crate::policy::check_spin_allowed;
use crate::reconcile::ActionKind;
use rewards_core::{Failure, Outcome, SpinAllowance, SpinAttempt};
use rewards_networking::api::classify;
use tracing::{info, warn};

impl RewardsManager {
    /// Spin the wheel and redeem the reward if the server left it pending.
    ///
    /// A reward whose redeem failed earlier is redeemed first, without a new spin.
    pub async fn spin_and_redeem(&self) -> Outcome<SpinAttempt> {
        let Ok(_guard) = self.spinning.try_lock() else {
            return Outcome::failure(Failure::precondition(BUSY_MESSAGE));
        };

        if let Some(pending) = self.pending_spin() {
            info!("Redeeming spin left pending by an earlier attempt");
            return self.redeem(pending).await;
        }

        let allowance = self.cached_allowance();
        if let Err(failure) = check_spin_allowed(allowance.as_ref()) {
            return Outcome::failure(failure);
        }

        let mut action = RetryableAction::new(self.config.spin_retry.clone(), self.cancel.child_token());
        let result = match action.run(|_| self.backend.spin()).await {
            Ok(result) => result,
            Err(RetryError::Exhausted { attempts, last_error }) => {
                warn!("Spin failed after {} attempts", attempts);
                return Outcome::failure(classify(&last_error, "Failed to spin the wheel"));
            }
            Err(RetryError::Cancelled { .. }) => return Outcome::failure(Failure::cancelled()),
        };

        let attempt = match SpinAttempt::from_result(result) {
            Ok(attempt) => attempt,
            Err(e) => return Outcome::failure(classify(&e, "Failed to spin the wheel")),
        };

        // spending a spin invalidates what we knew about the allowance
        self.set_allowance(None);

        if attempt.is_redeemed() {
            info!("Spin completed server-side");
            self.reconciler.reconcile(ActionKind::SpinRedeem).await;
            return Outcome::success(attempt);
        }

        self.redeem(attempt).await
    }

    async fn redeem(&self, mut attempt: SpinAttempt) -> Outcome<SpinAttempt> {
        let Some(spin_id) = attempt.spin_id().map(str::to_string) else {
            return Outcome::success(attempt);
        };

        match self.backend.redeem_spin(&spin_id).await {
            Ok(redeem) => {
                attempt.mark_redeemed(redeem);
                self.set_pending(None);
                info!("Spin {} redeemed", spin_id);
                self.reconciler.reconcile(ActionKind::SpinRedeem).await;
                Outcome::success(attempt)
            }
            Err(e) => {
                warn!("Redeem of spin {} failed: {}", spin_id, e);
                self.set_pending(Some(attempt));
                Outcome::failure(classify(&e, "Failed to redeem spin reward"))
            }
        }
    }

    /// Load the spin allowance and keep it for the local no-spins check
    pub async fn spin_status(&self) -> Outcome<SpinAllowance> {
        match self.backend.spin_status().await {
            Ok(allowance) => {
                self.set_allowance(Some(allowance.clone()));
                Outcome::success(allowance)
            }
            Err(e) => Outcome::failure(classify(&e, "Failed to load spin status")),
        }
    }

    /// A spin whose reward is still waiting to be redeemed
    pub fn pending_spin(&self) -> Option<SpinAttempt> {
        self.pending_spin.lock().ok().and_then(|p| p.clone())
    }

    fn cached_allowance(&self) -> Option<SpinAllowance> {
        self.allowance.lock().ok().and_then(|a| a.clone())
    }

    fn set_allowance(&self, allowance: Option<SpinAllowance>) {
        if let Ok(mut slot) = self.allowance.lock() {
            *slot = allowance;
        }
    }

    fn set_pending(&self, attempt: Option<SpinAttempt>) {
        if let Ok(mut slot) = self.pending_spin.lock() {
            *slot = attempt;
        }
    }
}
