//! The backend seam: every remote operation the request manager consumes

use async_trait::async_trait;
use rewards_core::{
    ChallengeCompletion, Leaderboard, MilestoneClaimResult, MilestoneId, PayoutBody,
    PayoutReceipt, RedeemResult, Result, SpinAllowance, SpinResult, TransactionPage,
    TransactionQuery, WalkathonProgress, WalletSnapshot,
};

/// Remote rewards API.
///
/// Implementations resolve `success:false` envelopes and transport failures
/// to `Err`, so callers classify both at one boundary. Refresh operations
/// return the full current aggregate, never deltas.
#[async_trait]
pub trait RewardsBackend: Send + Sync {
    /// Create a payout; `external_id` in the body is the idempotency key
    async fn submit_payout(&self, body: &PayoutBody) -> Result<PayoutReceipt>;

    /// Settlement status of a previously created payout order
    async fn payout_status(&self, order_id: &str) -> Result<PayoutReceipt>;

    async fn claim_milestone(&self, milestone: MilestoneId) -> Result<MilestoneClaimResult>;

    async fn spin(&self) -> Result<SpinResult>;

    async fn redeem_spin(&self, spin_id: &str) -> Result<RedeemResult>;

    async fn spin_status(&self) -> Result<SpinAllowance>;

    async fn complete_challenge(&self, conversion_id: &str) -> Result<ChallengeCompletion>;

    /// Wallet screen: balance and xp
    async fn fetch_wallet(&self) -> Result<WalletSnapshot>;

    async fn fetch_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage>;

    async fn fetch_progress(&self) -> Result<WalkathonProgress>;

    async fn fetch_leaderboard(&self) -> Result<Leaderboard>;
}
