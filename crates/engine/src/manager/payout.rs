//! Modal-scoped payout session

use crate::executor::IdempotentSubmitter;
use crate::reconcile::{ActionKind, StateReconciler};
use crate::validation::PayoutValidator;
use rewards_core::{
    AggregateKind, ExternalId, Failure, Outcome, PayoutForm, PayoutKind, PayoutReceipt,
    PayoutRequest, PayoutStatus, ValidatedPayout,
};
use rewards_persistence::StoreView;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct Draft {
    request: PayoutRequest,
    /// What was handed to the submitter for the current external id
    submitted: Option<ValidatedPayout>,
}

/// One open payout form.
///
/// Owns the draft, its external id, and a single-flight submitter. A failed
/// submission is followed by a fresh draft with a new external id on the
/// next submit; a succeeded one keeps returning its recorded outcome.
/// Closing the session stops local status updates; the shared store is
/// still reconciled for a payout that went through.
pub struct PayoutSession {
    kind: PayoutKind,
    draft: Mutex<Draft>,
    submitter: IdempotentSubmitter,
    validator: PayoutValidator,
    reconciler: StateReconciler,
    view: StoreView,
    cancel: CancellationToken,
}

impl PayoutSession {
    pub(crate) fn new(
        kind: PayoutKind,
        submitter: IdempotentSubmitter,
        validator: PayoutValidator,
        reconciler: StateReconciler,
        view: StoreView,
        cancel: CancellationToken,
    ) -> Self {
        let request = PayoutRequest::draft(kind);
        debug!("Opened {} payout session {}", kind.as_str(), request.external_id);
        Self {
            kind,
            draft: Mutex::new(Draft {
                request,
                submitted: None,
            }),
            submitter,
            validator,
            reconciler,
            view,
            cancel,
        }
    }

    pub fn kind(&self) -> PayoutKind {
        self.kind
    }

    pub fn external_id(&self) -> Option<ExternalId> {
        self.draft.lock().ok().map(|d| d.request.external_id.clone())
    }

    pub fn status(&self) -> Option<PayoutStatus> {
        self.draft.lock().ok().map(|d| d.request.status)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Validate the form and submit it once
    pub async fn submit(&self, form: &PayoutForm) -> Outcome<PayoutReceipt> {
        if self.is_closed() {
            return Outcome::failure(Failure::cancelled());
        }

        let editable = matches!(
            self.status(),
            Some(PayoutStatus::Draft | PayoutStatus::Validating | PayoutStatus::Failed)
        );
        if editable && self.view.balance().is_none() {
            self.reconciler.refresh(&[AggregateKind::Wallet]).await;
        }
        let balance = self.view.balance().unwrap_or_default();

        let (payout, initiated) = match self.prepare(form, balance) {
            Ok(prepared) => prepared,
            Err(failure) => return Outcome::failure(failure),
        };

        let external_id = payout.external_id.clone();
        let outcome = self.submitter.submit(payout).await;

        if !initiated {
            return outcome;
        }

        if self.is_closed() {
            debug!("Session closed before {} settled", external_id);
        } else if let Ok(mut draft) = self.draft.lock() {
            if draft.request.external_id == external_id {
                draft.request.status = if outcome.is_success() {
                    PayoutStatus::Succeeded
                } else {
                    PayoutStatus::Failed
                };
            }
        }

        if outcome.is_success() {
            info!("Payout {} succeeded", external_id);
            self.reconciler.reconcile(ActionKind::Payout).await;
        }

        outcome
    }

    /// Move the draft to `Submitting`. Returns the payout to send and
    /// whether this call started the submission.
    fn prepare(&self, form: &PayoutForm, balance: rewards_core::Coins) -> Result<(ValidatedPayout, bool), Failure> {
        let mut draft = self
            .draft
            .lock()
            .map_err(|_| Failure::precondition("Payout session is unavailable."))?;

        match draft.request.status {
            PayoutStatus::Submitting | PayoutStatus::Succeeded => {
                if let Some(payout) = draft.submitted.clone() {
                    return Ok((payout, false));
                }
            }
            PayoutStatus::Failed => {
                draft.request = PayoutRequest::draft(self.kind);
                draft.submitted = None;
                debug!("New draft {} after failure", draft.request.external_id);
            }
            PayoutStatus::Draft | PayoutStatus::Validating => {}
        }

        draft.request.fill(form);
        draft.request.status = PayoutStatus::Validating;

        match self.validator.validate(&draft.request, balance) {
            Ok(payout) => {
                draft.request.status = PayoutStatus::Submitting;
                draft.submitted = Some(payout.clone());
                Ok((payout, true))
            }
            Err(failure) => {
                draft.request.status = PayoutStatus::Draft;
                debug!("Payout draft rejected locally: {}", failure.user_message);
                Err(failure)
            }
        }
    }

    /// Close the modal. In-flight work finishes but no longer updates the session.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PayoutSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
