//! Post-action refresh of the cached aggregates an action touched

use crate::ledger::ClaimLedger;
use futures::future::join_all;
use rewards_core::{AggregateKind, Result, TransactionQuery};
use rewards_networking::RewardsBackend;
use rewards_persistence::AggregateStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A successful action whose side effects live on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Payout,
    MilestoneClaim,
    SpinRedeem,
    ChallengeComplete,
}

impl ActionKind {
    /// Aggregates the action invalidates
    pub fn affected(&self) -> &'static [AggregateKind] {
        match self {
            ActionKind::Payout => &[
                AggregateKind::Wallet,
                AggregateKind::RecentTransactions,
                AggregateKind::FullTransactions,
            ],
            ActionKind::MilestoneClaim => &[AggregateKind::Progress, AggregateKind::Leaderboard],
            ActionKind::SpinRedeem => &[AggregateKind::Wallet],
            ActionKind::ChallengeComplete => {
                &[AggregateKind::Wallet, AggregateKind::RecentTransactions]
            }
        }
    }
}

/// How transaction listings are fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQueries {
    pub recent_limit: u32,
    pub page_size: u32,
}

impl Default for TransactionQueries {
    fn default() -> Self {
        Self {
            recent_limit: 5,
            page_size: 20,
        }
    }
}

/// Single writer of the [`AggregateStore`].
///
/// Refreshes run concurrently and each one replaces its slice wholesale
/// when it completes. A failed refresh is logged and the last known value
/// stays in place; it never turns the triggering action into a failure.
#[derive(Clone)]
pub struct StateReconciler {
    backend: Arc<dyn RewardsBackend>,
    store: Arc<AggregateStore>,
    ledger: Arc<RwLock<ClaimLedger>>,
    queries: TransactionQueries,
}

impl StateReconciler {
    pub fn new(
        backend: Arc<dyn RewardsBackend>,
        store: Arc<AggregateStore>,
        ledger: Arc<RwLock<ClaimLedger>>,
    ) -> Self {
        Self {
            backend,
            store,
            ledger,
            queries: TransactionQueries::default(),
        }
    }

    pub fn with_queries(mut self, queries: TransactionQueries) -> Self {
        self.queries = queries;
        self
    }

    /// Refresh everything `trigger` touched and wait for all of it
    pub async fn reconcile(&self, trigger: ActionKind) -> Vec<AggregateKind> {
        info!("Reconciling after {:?}", trigger);
        self.refresh(trigger.affected()).await
    }

    /// Fire-and-forget variant of [`reconcile`](Self::reconcile)
    pub fn reconcile_detached(&self, trigger: ActionKind) -> JoinHandle<Vec<AggregateKind>> {
        let reconciler = self.clone();
        tokio::spawn(async move { reconciler.reconcile(trigger).await })
    }

    /// Refresh the given aggregates concurrently. Returns the ones that
    /// were replaced.
    pub async fn refresh(&self, kinds: &[AggregateKind]) -> Vec<AggregateKind> {
        let results = join_all(kinds.iter().map(|kind| async move {
            (*kind, self.refresh_one(*kind).await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(kind, result)| match result {
                Ok(()) => Some(kind),
                Err(e) => {
                    warn!("Refresh of {} failed, keeping last known value: {}", kind, e);
                    None
                }
            })
            .collect()
    }

    /// Refresh only the aggregates that are missing or past their refresh point
    pub async fn refresh_stale(&self, kinds: &[AggregateKind]) -> Vec<AggregateKind> {
        let stale = self.store.stale(kinds);
        if stale.is_empty() {
            debug!("All requested aggregates are fresh");
            return Vec::new();
        }
        self.refresh(&stale).await
    }

    async fn refresh_one(&self, kind: AggregateKind) -> Result<()> {
        debug!("Refreshing {}", kind);
        match kind {
            AggregateKind::Wallet => {
                let wallet = self.backend.fetch_wallet().await?;
                self.store.wallet.replace(wallet);
            }
            AggregateKind::RecentTransactions => {
                let query = TransactionQuery::Recent {
                    limit: self.queries.recent_limit,
                };
                let page = self.backend.fetch_transactions(&query).await?;
                self.store.recent_transactions.replace(page);
            }
            AggregateKind::FullTransactions => {
                let query = TransactionQuery::Page {
                    page: 1,
                    limit: self.queries.page_size,
                    kind: "all".to_string(),
                };
                let page = self.backend.fetch_transactions(&query).await?;
                self.store.full_transactions.replace(page);
            }
            AggregateKind::Progress => {
                let progress = self.backend.fetch_progress().await?;
                if let Ok(mut ledger) = self.ledger.write() {
                    ledger.apply_progress(&progress);
                }
                self.store.progress.replace(progress);
            }
            AggregateKind::Leaderboard => {
                let board = self.backend.fetch_leaderboard().await?;
                self.store.leaderboard.replace(board);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{progress, ScriptedBackend};
    use rewards_core::{Coins, Error, MilestoneId};
    use rewards_persistence::StoreView;
    use std::time::Duration;

    fn setup(backend: Arc<ScriptedBackend>) -> (StateReconciler, StoreView, Arc<RwLock<ClaimLedger>>) {
        let store = Arc::new(AggregateStore::default());
        let ledger = Arc::new(RwLock::new(ClaimLedger::new()));
        let reconciler = StateReconciler::new(backend, Arc::clone(&store), Arc::clone(&ledger));
        (reconciler, StoreView::new(store), ledger)
    }

    #[tokio::test]
    async fn test_payout_refreshes_wallet_and_transactions() {
        let backend = Arc::new(ScriptedBackend::new());
        let (reconciler, _view, _) = setup(backend.clone());

        let refreshed = reconciler.reconcile(ActionKind::Payout).await;
        assert_eq!(refreshed.len(), 3);
        assert_eq!(backend.calls("fetch_wallet"), 1);
        assert_eq!(backend.calls("fetch_recent_transactions"), 1);
        assert_eq!(backend.calls("fetch_full_transactions"), 1);
        assert_eq!(backend.calls("fetch_progress"), 0);
    }

    #[tokio::test]
    async fn test_claim_refresh_projects_into_ledger() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_progress(progress(&[5000], &[2500]));
        let (reconciler, view, ledger) = setup(backend.clone());

        reconciler.reconcile(ActionKind::MilestoneClaim).await;
        assert_eq!(backend.calls("fetch_leaderboard"), 1);
        assert!(view.progress().is_some());
        let ledger = ledger.read().unwrap();
        assert!(ledger.can_claim(MilestoneId(5000)));
        assert!(ledger.is_claimed(MilestoneId(2500)));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_value() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_balance(150.0);
        let (reconciler, view, _) = setup(backend.clone());

        reconciler.refresh(&[AggregateKind::Wallet]).await;
        assert_eq!(view.balance(), Some(Coins(150.0)));

        backend.set_balance(90.0);
        backend.fail_next_wallet(Error::NetworkError("offline".to_string()));
        let refreshed = reconciler.refresh(&[AggregateKind::Wallet]).await;

        assert!(refreshed.is_empty());
        assert_eq!(view.balance(), Some(Coins(150.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_value_readable_while_refresh_pending() {
        let backend = Arc::new(ScriptedBackend::new().with_latency(Duration::from_millis(100)));
        backend.set_balance(150.0);
        let (reconciler, view, _) = setup(backend.clone());
        reconciler.refresh(&[AggregateKind::Wallet]).await;

        backend.set_balance(60.0);
        let pending = reconciler.reconcile_detached(ActionKind::SpinRedeem);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(view.balance(), Some(Coins(150.0)));

        pending.await.unwrap();
        assert_eq!(view.balance(), Some(Coins(60.0)));
    }

    #[tokio::test]
    async fn test_refresh_stale_skips_fresh_slices() {
        let backend = Arc::new(ScriptedBackend::new());
        let (reconciler, _view, _) = setup(backend.clone());

        reconciler.refresh_stale(&[AggregateKind::Wallet]).await;
        reconciler.refresh_stale(&[AggregateKind::Wallet]).await;
        assert_eq!(backend.calls("fetch_wallet"), 1);
    }
}
