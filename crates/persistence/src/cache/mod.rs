//! Stale-while-revalidate store for server-owned aggregates
//!
//! Each aggregate lives in its own [`Slice`]. A refresh replaces the slice
//! wholesale; readers hold `Arc` snapshots, so a reader never observes a
//! half-applied refresh and the last-known value stays readable while a
//! refresh is pending or after one failed.

use rewards_core::{
    AggregateKind, Coins, Leaderboard, TransactionPage, WalkathonProgress, WalletSnapshot,
};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Share of the TTL after which a background refresh is due
const REFRESH_THRESHOLD: f64 = 0.8;

/// Age of a slice relative to its TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never loaded
    Missing,
    Fresh,
    /// Still served, but a background refresh should start
    DueForRefresh,
    /// Past the TTL; still readable until replaced
    Expired,
}

impl Freshness {
    /// True when a refresh should be scheduled
    pub fn wants_refresh(&self) -> bool {
        !matches!(self, Freshness::Fresh)
    }
}

struct Entry<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// One cached aggregate with its TTL
pub struct Slice<T> {
    entry: RwLock<Option<Entry<T>>>,
    ttl: Duration,
}

impl<T> Slice<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    /// Last known value, regardless of age
    pub fn get(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().ok()?;
        entry.as_ref().map(|e| Arc::clone(&e.value))
    }

    /// Replace the slice with a freshly fetched value
    pub fn replace(&self, value: T) {
        if let Ok(mut entry) = self.entry.write() {
            *entry = Some(Entry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
            });
        }
    }

    pub fn age(&self) -> Option<Duration> {
        let entry = self.entry.read().ok()?;
        entry.as_ref().map(|e| e.fetched_at.elapsed())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn freshness(&self) -> Freshness {
        match self.age() {
            None => Freshness::Missing,
            Some(age) if age >= self.ttl => Freshness::Expired,
            Some(age) if age >= self.ttl.mul_f64(REFRESH_THRESHOLD) => Freshness::DueForRefresh,
            Some(_) => Freshness::Fresh,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entry) = self.entry.write() {
            *entry = None;
        }
    }
}

/// Per-aggregate time to live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTtls {
    pub wallet: Duration,
    pub transactions: Duration,
    pub progress: Duration,
    pub leaderboard: Duration,
}

impl Default for StoreTtls {
    fn default() -> Self {
        Self {
            wallet: Duration::from_secs(5 * 60),
            transactions: Duration::from_secs(3 * 60),
            progress: Duration::from_secs(30),
            leaderboard: Duration::from_secs(30),
        }
    }
}

/// Shared container for every server-owned aggregate.
///
/// Only the reconciler writes here; everything else reads through a
/// [`StoreView`].
pub struct AggregateStore {
    pub wallet: Slice<WalletSnapshot>,
    pub recent_transactions: Slice<TransactionPage>,
    pub full_transactions: Slice<TransactionPage>,
    pub progress: Slice<WalkathonProgress>,
    pub leaderboard: Slice<Leaderboard>,
}

impl AggregateStore {
    pub fn new(ttls: StoreTtls) -> Self {
        Self {
            wallet: Slice::new(ttls.wallet),
            recent_transactions: Slice::new(ttls.transactions),
            full_transactions: Slice::new(ttls.transactions),
            progress: Slice::new(ttls.progress),
            leaderboard: Slice::new(ttls.leaderboard),
        }
    }

    pub fn freshness(&self, kind: AggregateKind) -> Freshness {
        match kind {
            AggregateKind::Wallet => self.wallet.freshness(),
            AggregateKind::RecentTransactions => self.recent_transactions.freshness(),
            AggregateKind::FullTransactions => self.full_transactions.freshness(),
            AggregateKind::Progress => self.progress.freshness(),
            AggregateKind::Leaderboard => self.leaderboard.freshness(),
        }
    }

    /// Kinds among `kinds` that are missing, due, or expired
    pub fn stale(&self, kinds: &[AggregateKind]) -> Vec<AggregateKind> {
        kinds
            .iter()
            .copied()
            .filter(|k| self.freshness(*k).wants_refresh())
            .collect()
    }

    pub fn clear(&self) {
        self.wallet.clear();
        self.recent_transactions.clear();
        self.full_transactions.clear();
        self.progress.clear();
        self.leaderboard.clear();
    }
}

impl Default for AggregateStore {
    fn default() -> Self {
        Self::new(StoreTtls::default())
    }
}

/// Read-only handle onto the shared store
#[derive(Clone)]
pub struct StoreView {
    store: Arc<AggregateStore>,
}

impl StoreView {
    pub fn new(store: Arc<AggregateStore>) -> Self {
        Self { store }
    }

    pub fn wallet(&self) -> Option<Arc<WalletSnapshot>> {
        self.store.wallet.get()
    }

    /// Last known coin balance
    pub fn balance(&self) -> Option<Coins> {
        self.wallet().map(|w| w.balance())
    }

    pub fn recent_transactions(&self) -> Option<Arc<TransactionPage>> {
        self.store.recent_transactions.get()
    }

    pub fn full_transactions(&self) -> Option<Arc<TransactionPage>> {
        self.store.full_transactions.get()
    }

    pub fn progress(&self) -> Option<Arc<WalkathonProgress>> {
        self.store.progress.get()
    }

    pub fn leaderboard(&self) -> Option<Arc<Leaderboard>> {
        self.store.leaderboard.get()
    }

    pub fn freshness(&self, kind: AggregateKind) -> Freshness {
        self.store.freshness(kind)
    }
}
