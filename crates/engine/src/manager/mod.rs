//! The request manager facade handed to the UI layer

mod payout;
mod spin;

pub use payout::PayoutSession;

use crate::config::ManagerConfig;
use crate::executor::{IdempotentSubmitter, BUSY_MESSAGE};
use crate::ledger::ClaimLedger;
use crate::policy::{ChallengeCompletionPolicy, WithdrawalGate};
use crate::poller::{spawn_auto_refresh, AutoRefreshHandle};
use crate::reconcile::{ActionKind, StateReconciler, TransactionQueries};
use crate::validation::PayoutValidator;
use chrono::Utc;
use rewards_core::{
    AggregateKind, ChallengeCompletion, Coins, Failure, MilestoneClaimResult, MilestoneId,
    Outcome, PayoutKind, PayoutReceipt, SpinAllowance, SpinAttempt, TodayChallenge,
};
use rewards_networking::api::classify;
use rewards_networking::RewardsBackend;
use rewards_persistence::{AggregateStore, Database, StoreView};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const ALREADY_CLAIMED_MESSAGE: &str = "This reward has already been claimed.";
pub const NOT_REACHED_MESSAGE: &str = "This milestone hasn't been reached yet.";

/// Entry point for every reward-bearing action.
///
/// Owns the shared aggregate store (written only through its reconciler),
/// the claim ledger, and the single-flight guards for claims and spins.
pub struct RewardsManager {
    config: ManagerConfig,
    backend: Arc<dyn RewardsBackend>,
    store: Arc<AggregateStore>,
    ledger: Arc<RwLock<ClaimLedger>>,
    reconciler: StateReconciler,
    journal: Option<Database>,
    claiming: Mutex<()>,
    spinning: Mutex<()>,
    allowance: std::sync::Mutex<Option<SpinAllowance>>,
    pending_spin: std::sync::Mutex<Option<SpinAttempt>>,
    cancel: CancellationToken,
}

impl RewardsManager {
    pub fn new(backend: Arc<dyn RewardsBackend>, config: ManagerConfig) -> Self {
        let store = Arc::new(AggregateStore::new(config.ttls()));
        let ledger = Arc::new(RwLock::new(ClaimLedger::new()));
        let reconciler =
            StateReconciler::new(Arc::clone(&backend), Arc::clone(&store), Arc::clone(&ledger))
                .with_queries(TransactionQueries {
                    recent_limit: config.recent_transactions_limit,
                    page_size: config.transactions_page_size,
                });

        Self {
            config,
            backend,
            store,
            ledger,
            reconciler,
            journal: None,
            claiming: Mutex::new(()),
            spinning: Mutex::new(()),
            allowance: std::sync::Mutex::new(None),
            pending_spin: std::sync::Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Journal payout submissions to SQLite
    pub fn with_journal(mut self, db: Database) -> Self {
        self.journal = Some(db);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Read-only access to the cached aggregates
    pub fn view(&self) -> StoreView {
        StoreView::new(Arc::clone(&self.store))
    }

    /// Snapshot of the claim ledger
    pub fn ledger(&self) -> ClaimLedger {
        self.ledger.read().map(|l| l.clone()).unwrap_or_default()
    }

    /// Open a payout form of the given kind
    pub fn open_payout(&self, kind: PayoutKind) -> PayoutSession {
        let mut submitter = IdempotentSubmitter::new(Arc::clone(&self.backend));
        if let Some(db) = &self.journal {
            submitter = submitter.with_journal(db.clone());
        }
        PayoutSession::new(
            kind,
            submitter,
            PayoutValidator::new(self.config.minimum_payout_usd),
            self.reconciler.clone(),
            self.view(),
            self.cancel.child_token(),
        )
    }

    /// Whether the withdrawal options may be opened with the last known balance
    pub fn can_open_withdrawal(&self) -> bool {
        self.view()
            .balance()
            .map(|b| self.withdrawal_gate().allows(b))
            .unwrap_or(false)
    }

    pub fn withdrawal_gate(&self) -> WithdrawalGate {
        WithdrawalGate::new(Coins(self.config.withdrawal_minimum_coins))
    }

    /// Refresh the given aggregates now
    pub async fn refresh(&self, kinds: &[AggregateKind]) -> Vec<AggregateKind> {
        self.reconciler.refresh(kinds).await
    }

    /// Refresh only what is missing or due
    pub async fn refresh_stale(&self, kinds: &[AggregateKind]) -> Vec<AggregateKind> {
        self.reconciler.refresh_stale(kinds).await
    }

    pub fn start_auto_refresh(&self, kinds: Vec<AggregateKind>, interval: Duration) -> AutoRefreshHandle {
        spawn_auto_refresh(self.reconciler.clone(), kinds, interval, self.cancel.child_token())
    }

    /// Walkathon screen polling: progress and leaderboard
    pub fn start_walkathon_refresh(&self) -> AutoRefreshHandle {
        self.start_auto_refresh(
            vec![AggregateKind::Progress, AggregateKind::Leaderboard],
            self.config.poll_interval(),
        )
    }

    /// Claim one walkathon milestone
    pub async fn claim(&self, milestone: MilestoneId) -> Outcome<MilestoneClaimResult> {
        let Ok(_guard) = self.claiming.try_lock() else {
            return Outcome::failure(Failure::precondition(BUSY_MESSAGE));
        };

        let outcome = self.claim_one(milestone).await;
        if outcome.is_success() {
            self.reconciler.reconcile(ActionKind::MilestoneClaim).await;
        }
        outcome
    }

    /// Claim every reachable milestone, one at a time
    pub async fn claim_all_available(&self) -> Vec<(MilestoneId, Outcome<MilestoneClaimResult>)> {
        let Ok(_guard) = self.claiming.try_lock() else {
            warn!("Claim-all skipped: a claim is already in progress");
            return Vec::new();
        };

        self.ensure_progress().await;
        let available = self.ledger().available();
        info!("Claiming {} available milestones", available.len());

        let mut results = Vec::with_capacity(available.len());
        for milestone in available {
            if self.cancel.is_cancelled() {
                break;
            }
            let outcome = self.claim_one(milestone).await;
            results.push((milestone, outcome));
        }

        if results.iter().any(|(_, o)| o.is_success()) {
            self.reconciler.reconcile(ActionKind::MilestoneClaim).await;
        }
        results
    }

    async fn claim_one(&self, milestone: MilestoneId) -> Outcome<MilestoneClaimResult> {
        self.ensure_progress().await;

        let ledger = self.ledger();
        if !ledger.can_claim(milestone) {
            let message = if ledger.is_claimed(milestone) {
                ALREADY_CLAIMED_MESSAGE
            } else {
                NOT_REACHED_MESSAGE
            };
            return Outcome::failure(Failure::precondition(message));
        }

        match self.backend.claim_milestone(milestone).await {
            Ok(result) => {
                info!("Milestone {} claimed", milestone);
                if let Ok(mut ledger) = self.ledger.write() {
                    ledger.mark_claimed(milestone);
                }
                Outcome::success(result)
            }
            Err(e) => {
                warn!("Claim of milestone {} failed: {}", milestone, e);
                Outcome::failure(classify(&e, "Failed to claim reward"))
            }
        }
    }

    /// Load progress once if nothing is known yet
    async fn ensure_progress(&self) {
        if self.store.progress.get().is_none() {
            self.reconciler.refresh(&[AggregateKind::Progress]).await;
        }
    }

    /// Complete today's challenge once its play window has passed
    pub async fn complete_challenge(&self, challenge: &TodayChallenge) -> Outcome<ChallengeCompletion> {
        let policy = ChallengeCompletionPolicy::new(self.config.challenge_window());
        if let Err(failure) = policy.check(challenge, Utc::now()) {
            return Outcome::failure(failure);
        }

        match self.backend.complete_challenge(&challenge.conversion_id).await {
            Ok(completion) => {
                info!("Daily challenge {} completed", challenge.conversion_id);
                self.reconciler.reconcile(ActionKind::ChallengeComplete).await;
                Outcome::success(completion)
            }
            Err(e) => {
                warn!("Challenge completion failed: {}", e);
                Outcome::failure(classify(&e, "Failed to complete challenge"))
            }
        }
    }

    /// Settlement status of a submitted payout
    pub async fn payout_status(&self, order_id: &str) -> Outcome<PayoutReceipt> {
        match self.backend.payout_status(order_id).await {
            Ok(receipt) => Outcome::success(receipt),
            Err(e) => Outcome::failure(classify(&e, "Failed to load payout status")),
        }
    }

    /// Stop retries and background work owned by this manager
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{progress, ScriptedBackend};
    use rewards_core::{ChallengeType, Error, ErrorClass, Field, PayoutForm, PayoutStatus};

    fn manager(backend: Arc<ScriptedBackend>) -> RewardsManager {
        RewardsManager::new(backend, ManagerConfig::default())
    }

    fn gift_card_form(amount: &str) -> PayoutForm {
        PayoutForm {
            amount: amount.to_string(),
            recipient_name: "Ann Lee".to_string(),
            recipient_email: "ann@example.com".to_string(),
            product_id: Some("prod_amazon".to_string()),
            funding_source_id: Some("fs_1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_gift_card_happy_path() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_balance(100.0);
        let manager = manager(backend.clone());

        let session = manager.open_payout(PayoutKind::GiftCard);
        let external_id = session.external_id().unwrap();
        assert!(external_id.as_str().starts_with("gift_card_"));

        let form = PayoutForm {
            amount: "25.00".to_string(),
            recipient_name: "Jane Doe".to_string(),
            recipient_email: "jane@example.com".to_string(),
            ..gift_card_form("")
        };
        let outcome = session.submit(&form).await;

        assert!(outcome.is_success());
        assert_eq!(session.status(), Some(PayoutStatus::Succeeded));
        assert_eq!(backend.calls("submit_payout"), 1);
        let body = &backend.payout_bodies()[0];
        assert_eq!(body.external_id, external_id.as_str());
        assert_eq!(body.reward.value.denomination, 25.0);
        assert_eq!(body.reward.recipient.name, "Jane Doe");
        // balance fetched for validation, then refreshed after success
        assert_eq!(backend.calls("fetch_wallet"), 2);
        assert_eq!(backend.calls("fetch_recent_transactions"), 1);
        assert_eq!(manager.view().balance(), Some(Coins(100.0)));

        // a second submit returns the recorded outcome
        let again = session.submit(&form).await;
        assert_eq!(again, outcome);
        assert_eq!(backend.calls("submit_payout"), 1);
    }

    /// Submit `form` on a fresh gift card session with a 100 coin balance
    async fn rejected_field(form: PayoutForm, field: Field) -> (Option<String>, u32) {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_balance(100.0);
        let manager = manager(backend.clone());
        let session = manager.open_payout(PayoutKind::GiftCard);

        let outcome = session.submit(&form).await;
        let failure = outcome.error().unwrap();
        assert!(matches!(failure.classification, ErrorClass::FieldValidation { .. }));
        assert_eq!(session.status(), Some(PayoutStatus::Draft));
        let message = failure
            .field_errors()
            .and_then(|f| f.get(field))
            .map(str::to_string);
        (message, backend.calls("submit_payout"))
    }

    #[tokio::test]
    async fn test_below_minimum_never_reaches_network() {
        let (message, calls) = rejected_field(gift_card_form("3"), Field::Amount).await;
        assert_eq!(message.as_deref(), Some("Minimum gift card amount is $5."));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_amount_over_balance_never_reaches_network() {
        let (message, calls) = rejected_field(gift_card_form("100.01"), Field::Amount).await;
        assert_eq!(message.as_deref(), Some("Amount exceeds available balance"));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_bad_name_never_reaches_network() {
        let form = PayoutForm {
            recipient_name: "J4ne".to_string(),
            ..gift_card_form("25")
        };
        let (message, calls) = rejected_field(form, Field::RecipientName).await;
        assert_eq!(
            message.as_deref(),
            Some("Recipient name can only contain letters, spaces, hyphens, and apostrophes")
        );
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_malformed_email_never_reaches_network() {
        let form = PayoutForm {
            recipient_email: "jane@example".to_string(),
            ..gift_card_form("25")
        };
        let (message, calls) = rejected_field(form, Field::RecipientEmail).await;
        assert_eq!(
            message.as_deref(),
            Some("Please enter a valid email address (e.g., user@example.com)")
        );
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_double_submit_race_sends_once() {
        let backend = Arc::new(
            ScriptedBackend::new().with_latency(std::time::Duration::from_millis(20)),
        );
        backend.set_balance(500.0);
        let manager = manager(backend.clone());
        manager.refresh(&[AggregateKind::Wallet]).await;
        let session = manager.open_payout(PayoutKind::MoneyTransfer);

        let form = gift_card_form("10");
        let (a, b) = tokio::join!(session.submit(&form), session.submit(&form));

        assert!(a.is_success());
        assert_eq!(a, b);
        assert_eq!(backend.calls("submit_payout"), 1);
        // only the submit that started the request reconciles
        assert_eq!(backend.calls("fetch_full_transactions"), 1);
    }

    #[tokio::test]
    async fn test_failed_payout_gets_new_external_id() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_balance(500.0);
        backend.push_payout(Err(Error::NetworkError("connection reset".to_string())));
        let manager = manager(backend.clone());
        let session = manager.open_payout(PayoutKind::Charity);

        let first_id = session.external_id().unwrap();
        let failed = session.submit(&gift_card_form("10")).await;
        assert_eq!(
            failed.error().unwrap().classification,
            ErrorClass::TransientNetwork
        );
        assert_eq!(session.status(), Some(PayoutStatus::Failed));
        assert_eq!(backend.calls("fetch_recent_transactions"), 0);

        let retried = session.submit(&gift_card_form("10")).await;
        assert!(retried.is_success());
        let second_id = session.external_id().unwrap();
        assert_ne!(first_id, second_id);

        let bodies = backend.payout_bodies();
        assert_eq!(bodies[0].external_id, first_id.as_str());
        assert_eq!(bodies[1].external_id, second_id.as_str());
    }

    #[tokio::test]
    async fn test_closed_session_refuses_submit() {
        let backend = Arc::new(ScriptedBackend::new());
        let manager = manager(backend.clone());
        let session = manager.open_payout(PayoutKind::DebitCard);
        session.close();

        let outcome = session.submit(&gift_card_form("10")).await;
        assert_eq!(outcome.error().unwrap().classification, ErrorClass::Cancelled);
        assert_eq!(backend.calls("submit_payout"), 0);
    }

    #[tokio::test]
    async fn test_claim_then_already_claimed_is_local() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_progress(progress(&[5000], &[]));
        let manager = manager(backend.clone());

        let first = manager.claim(MilestoneId(5000)).await;
        assert!(first.is_success());
        assert_eq!(backend.calls("fetch_leaderboard"), 1);

        let second = manager.claim(MilestoneId(5000)).await;
        assert_eq!(second.error().unwrap().user_message, ALREADY_CLAIMED_MESSAGE);
        assert_eq!(backend.calls("claim_milestone"), 1);

        let locked = manager.claim(MilestoneId(20000)).await;
        assert_eq!(locked.error().unwrap().user_message, NOT_REACHED_MESSAGE);
        assert_eq!(backend.calls("claim_milestone"), 1);
    }

    #[tokio::test]
    async fn test_claim_rejection_keeps_server_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_progress(progress(&[5000], &[]));
        backend.push_claim(Err(Error::rejected(Some(200), "Reward window closed")));
        let manager = manager(backend.clone());

        let outcome = manager.claim(MilestoneId(5000)).await;
        assert_eq!(outcome.error().unwrap().user_message, "Reward window closed");
        assert!(manager.ledger().can_claim(MilestoneId(5000)));
    }

    #[tokio::test]
    async fn test_claim_all_is_sequential_and_reconciles_once() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_progress(progress(&[5000, 10000, 15000], &[2500]));
        let manager = manager(backend.clone());

        let results = manager.claim_all_available().await;
        let claimed: Vec<MilestoneId> = results.iter().map(|(m, _)| *m).collect();
        assert_eq!(claimed, vec![MilestoneId(5000), MilestoneId(10000), MilestoneId(15000)]);
        assert!(results.iter().all(|(_, o)| o.is_success()));
        assert_eq!(backend.calls("claim_milestone"), 3);
        assert_eq!(backend.calls("fetch_leaderboard"), 1);
        assert!(manager.ledger().available().is_empty());
    }

    #[tokio::test]
    async fn test_withdrawal_gate_uses_last_known_balance() {
        let backend = Arc::new(ScriptedBackend::new());
        let manager = manager(backend.clone());
        assert!(!manager.can_open_withdrawal());

        backend.set_balance(19.0);
        manager.refresh(&[AggregateKind::Wallet]).await;
        assert!(!manager.can_open_withdrawal());

        backend.set_balance(20.0);
        manager.refresh(&[AggregateKind::Wallet]).await;
        assert!(manager.can_open_withdrawal());
    }

    #[tokio::test]
    async fn test_complete_challenge_refreshes_wallet() {
        let backend = Arc::new(ScriptedBackend::new());
        let manager = manager(backend.clone());

        let early = TodayChallenge {
            conversion_id: "conv_1".to_string(),
            challenge_type: ChallengeType::Game,
            started_at: Some(Utc::now()),
        };
        assert!(!manager.complete_challenge(&early).await.is_success());
        assert_eq!(backend.calls("complete_challenge"), 0);

        let spin = TodayChallenge {
            challenge_type: ChallengeType::Spin,
            ..early
        };
        assert!(manager.complete_challenge(&spin).await.is_success());
        assert_eq!(backend.calls("fetch_wallet"), 1);
        assert_eq!(backend.calls("fetch_recent_transactions"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_auto_refresh() {
        let backend = Arc::new(ScriptedBackend::new());
        let manager = manager(backend.clone());
        let handle = manager.start_walkathon_refresh();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(backend.calls("fetch_progress"), 2);

        manager.shutdown();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_running());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.calls("fetch_progress"), 2);
    }
}
