//! Single-flight payout submission keyed by external id

use futures::future::{BoxFuture, FutureExt, Shared};
use rewards_core::{
    ErrorClass, ExternalId, Failure, Outcome, PayoutReceipt, PayoutStatus, ValidatedPayout,
};
use rewards_networking::api::classify_payout;
use rewards_networking::RewardsBackend;
use rewards_persistence::sqlite::{get_payout, record_failed, record_submitting, record_succeeded};
use rewards_persistence::Database;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const BUSY_MESSAGE: &str = "A request is already in progress.";

type PayoutFuture = Shared<BoxFuture<'static, Outcome<PayoutReceipt>>>;

enum Slot {
    Idle,
    InFlight {
        external_id: ExternalId,
        result: PayoutFuture,
    },
    Settled {
        external_id: ExternalId,
        outcome: Outcome<PayoutReceipt>,
    },
}

/// Sends a payout at most once per external id.
///
/// One submitter belongs to one payout session. While a submission is in
/// flight, a repeat of the same id joins it and a different id is refused.
/// Once settled, the recorded outcome is returned for that id without
/// another call. The network call runs on its own task, so it completes
/// and settles even if every caller stops waiting.
pub struct IdempotentSubmitter {
    backend: Arc<dyn RewardsBackend>,
    journal: Option<Database>,
    slot: Arc<Mutex<Slot>>,
}

impl IdempotentSubmitter {
    pub fn new(backend: Arc<dyn RewardsBackend>) -> Self {
        Self {
            backend,
            journal: None,
            slot: Arc::new(Mutex::new(Slot::Idle)),
        }
    }

    /// Record every attempt in the payout journal
    pub fn with_journal(mut self, db: Database) -> Self {
        self.journal = Some(db);
        self
    }

    pub async fn is_in_flight(&self) -> bool {
        matches!(*self.slot.lock().await, Slot::InFlight { .. })
    }

    pub async fn submit(&self, payout: ValidatedPayout) -> Outcome<PayoutReceipt> {
        let pending = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::InFlight { external_id, result } if *external_id == payout.external_id => {
                    debug!("Joining in-flight submission {}", external_id);
                    result.clone()
                }
                Slot::InFlight { external_id, .. } => {
                    warn!("Refusing {} while {} is in flight", payout.external_id, external_id);
                    return Outcome::failure(Failure::precondition(BUSY_MESSAGE));
                }
                Slot::Settled { external_id, outcome } if *external_id == payout.external_id => {
                    debug!("Returning recorded outcome for {}", external_id);
                    return outcome.clone();
                }
                _ => {
                    if let Some(outcome) = self.journaled_success(&payout.external_id).await {
                        *slot = Slot::Settled {
                            external_id: payout.external_id.clone(),
                            outcome: outcome.clone(),
                        };
                        return outcome;
                    }

                    let external_id = payout.external_id.clone();
                    let result = self.dispatch(payout).shared();
                    *slot = Slot::InFlight {
                        external_id,
                        result: result.clone(),
                    };
                    result
                }
            }
        };

        pending.await
    }

    /// An id the journal already settled as succeeded is never sent again
    async fn journaled_success(&self, external_id: &ExternalId) -> Option<Outcome<PayoutReceipt>> {
        let db = self.journal.as_ref()?;
        match get_payout(db.pool(), external_id.as_str()).await {
            Ok(Some(row)) if row.is_succeeded() => {
                info!("Payout {} already succeeded, not resending", external_id);
                Some(Outcome::success(PayoutReceipt {
                    order_id: row.order_id,
                    status: Some(row.status),
                    message: row.message,
                }))
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Payout journal lookup failed for {}: {}", external_id, e);
                None
            }
        }
    }

    fn dispatch(&self, payout: ValidatedPayout) -> BoxFuture<'static, Outcome<PayoutReceipt>> {
        let backend = Arc::clone(&self.backend);
        let journal = self.journal.clone();
        let slot = Arc::clone(&self.slot);

        let task = tokio::spawn(async move {
            let id = payout.external_id.as_str();

            if let Some(db) = &journal {
                if let Err(e) = record_submitting(db.pool(), &payout).await {
                    warn!("Failed to journal payout {}: {}", id, e);
                }
            }

            info!(
                "Submitting {} payout {} for {}",
                payout.kind.as_str(),
                id,
                payout.amount
            );

            let outcome = match backend.submit_payout(&payout.to_body()).await {
                Ok(receipt) => {
                    info!("Payout {} {}", id, PayoutStatus::Succeeded.as_str());
                    if let Some(db) = &journal {
                        if let Err(e) = record_succeeded(db.pool(), id, &receipt).await {
                            warn!("Failed to journal payout {}: {}", id, e);
                        }
                    }
                    Outcome::success(receipt)
                }
                Err(e) => {
                    let failure = classify_payout(&e, payout.kind);
                    warn!("Payout {} {}: {}", id, PayoutStatus::Failed.as_str(), e);
                    if let Some(db) = &journal {
                        if let Err(e) = record_failed(db.pool(), id, &failure.user_message).await {
                            warn!("Failed to journal payout {}: {}", id, e);
                        }
                    }
                    Outcome::failure(failure)
                }
            };

            *slot.lock().await = Slot::Settled {
                external_id: payout.external_id.clone(),
                outcome: outcome.clone(),
            };
            outcome
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Payout task failed: {}", e);
                    Outcome::failure(Failure::new(
                        ErrorClass::ServerRejection { status: None },
                        "An unexpected error occurred.",
                    ))
                }
            }
        }
        .boxed()
    }
}
