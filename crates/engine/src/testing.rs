//! Scripted in-process backend for engine tests

use async_trait::async_trait;
use rewards_core::{
    ChallengeCompletion, ClaimedReward, Coins, Leaderboard, Milestone, MilestoneClaimResult,
    MilestoneId, PayoutBody, PayoutReceipt, RedeemResult, Result, SpinAllowance, SpinResult,
    SpinStatus, TransactionPage, TransactionQuery, WalkathonProgress, WalletBalance,
    WalletSnapshot, XpStatus,
};
use rewards_networking::RewardsBackend;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct Script {
    payouts: VecDeque<Result<PayoutReceipt>>,
    claims: VecDeque<Result<MilestoneClaimResult>>,
    spins: VecDeque<Result<SpinResult>>,
    redeems: VecDeque<Result<RedeemResult>>,
    challenges: VecDeque<Result<ChallengeCompletion>>,
    wallet_failures: VecDeque<rewards_core::Error>,
    wallet: WalletSnapshot,
    progress: WalkathonProgress,
    allowance: Option<SpinAllowance>,
    payout_bodies: Vec<PayoutBody>,
    calls: HashMap<&'static str, u32>,
}

/// Backend whose responses are queued up front.
///
/// Unscripted calls succeed with a neutral value; refreshes return the
/// current wallet and progress, which tests mutate between steps.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    latency: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self, op: &str) -> u32 {
        self.script.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn payout_bodies(&self) -> Vec<PayoutBody> {
        self.script.lock().unwrap().payout_bodies.clone()
    }

    pub fn push_payout(&self, result: Result<PayoutReceipt>) {
        self.script.lock().unwrap().payouts.push_back(result);
    }

    pub fn push_claim(&self, result: Result<MilestoneClaimResult>) {
        self.script.lock().unwrap().claims.push_back(result);
    }

    pub fn push_spin(&self, result: Result<SpinResult>) {
        self.script.lock().unwrap().spins.push_back(result);
    }

    pub fn push_redeem(&self, result: Result<RedeemResult>) {
        self.script.lock().unwrap().redeems.push_back(result);
    }

    pub fn push_challenge(&self, result: Result<ChallengeCompletion>) {
        self.script.lock().unwrap().challenges.push_back(result);
    }

    pub fn fail_next_wallet(&self, err: rewards_core::Error) {
        self.script.lock().unwrap().wallet_failures.push_back(err);
    }

    pub fn set_balance(&self, coins: f64) {
        self.script.lock().unwrap().wallet = wallet(coins);
    }

    pub fn set_progress(&self, progress: WalkathonProgress) {
        self.script.lock().unwrap().progress = progress;
    }

    pub fn set_allowance(&self, allowance: SpinAllowance) {
        self.script.lock().unwrap().allowance = Some(allowance);
    }

    fn record(&self, op: &'static str) {
        *self.script.lock().unwrap().calls.entry(op).or_insert(0) += 1;
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

pub fn wallet(coins: f64) -> WalletSnapshot {
    WalletSnapshot {
        wallet: WalletBalance {
            balance: Coins(coins),
            currency: None,
        },
        xp: XpStatus::default(),
    }
}

/// Progress with `reached` claimable and `claimed` already claimed
pub fn progress(reached: &[u64], claimed: &[u64]) -> WalkathonProgress {
    let milestone = |id: &u64| Milestone {
        step_milestone: MilestoneId(*id),
        coin_reward: 10.0,
        xp_reward: 5.0,
    };
    WalkathonProgress {
        total_steps: reached.iter().chain(claimed).copied().max().unwrap_or(0),
        milestones: reached.iter().chain(claimed).map(milestone).collect(),
        available_rewards: reached.iter().map(milestone).collect(),
        rewards_claimed: claimed
            .iter()
            .map(|id| ClaimedReward::Milestone(MilestoneId(*id)))
            .collect(),
    }
}

#[async_trait]
impl RewardsBackend for ScriptedBackend {
    async fn submit_payout(&self, body: &PayoutBody) -> Result<PayoutReceipt> {
        self.record("submit_payout");
        self.script.lock().unwrap().payout_bodies.push(body.clone());
        self.pause().await;
        let next = self.script.lock().unwrap().payouts.pop_front();
        next.unwrap_or_else(|| {
            Ok(PayoutReceipt {
                order_id: Some(format!("ord_{}", body.external_id)),
                ..Default::default()
            })
        })
    }

    async fn payout_status(&self, order_id: &str) -> Result<PayoutReceipt> {
        self.record("payout_status");
        Ok(PayoutReceipt {
            order_id: Some(order_id.to_string()),
            status: Some("EXECUTED".to_string()),
            message: None,
        })
    }

    async fn claim_milestone(&self, milestone: MilestoneId) -> Result<MilestoneClaimResult> {
        self.record("claim_milestone");
        self.pause().await;
        let next = self.script.lock().unwrap().claims.pop_front();
        let result = next.unwrap_or_else(|| {
            Ok(MilestoneClaimResult {
                success: true,
                message: None,
                reward: None,
                transaction: None,
            })
        });
        if result.is_ok() {
            // the server now reports the milestone as claimed
            let mut script = self.script.lock().unwrap();
            script
                .progress
                .available_rewards
                .retain(|m| m.step_milestone != milestone);
            script
                .progress
                .rewards_claimed
                .push(ClaimedReward::Milestone(milestone));
        }
        result
    }

    async fn spin(&self) -> Result<SpinResult> {
        self.record("spin");
        self.pause().await;
        let next = self.script.lock().unwrap().spins.pop_front();
        next.unwrap_or_else(|| {
            Ok(SpinResult {
                status: SpinStatus::Completed,
                spin_id: None,
                reward: None,
            })
        })
    }

    async fn redeem_spin(&self, _spin_id: &str) -> Result<RedeemResult> {
        self.record("redeem_spin");
        self.pause().await;
        let next = self.script.lock().unwrap().redeems.pop_front();
        next.unwrap_or_else(|| {
            Ok(RedeemResult {
                new_balance: Coins::default(),
                reward: None,
            })
        })
    }

    async fn spin_status(&self) -> Result<SpinAllowance> {
        self.record("spin_status");
        Ok(self.script.lock().unwrap().allowance.clone().unwrap_or(SpinAllowance {
            can_spin: true,
            remaining_spins: 1,
            cooldown_seconds: 0,
        }))
    }

    async fn complete_challenge(&self, _conversion_id: &str) -> Result<ChallengeCompletion> {
        self.record("complete_challenge");
        self.pause().await;
        let next = self.script.lock().unwrap().challenges.pop_front();
        next.unwrap_or_else(|| Ok(ChallengeCompletion::default()))
    }

    async fn fetch_wallet(&self) -> Result<WalletSnapshot> {
        self.record("fetch_wallet");
        self.pause().await;
        let mut script = self.script.lock().unwrap();
        match script.wallet_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(script.wallet.clone()),
        }
    }

    async fn fetch_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        match query {
            TransactionQuery::Recent { .. } => self.record("fetch_recent_transactions"),
            TransactionQuery::Page { .. } => self.record("fetch_full_transactions"),
        }
        self.pause().await;
        Ok(TransactionPage::default())
    }

    async fn fetch_progress(&self) -> Result<WalkathonProgress> {
        self.record("fetch_progress");
        self.pause().await;
        Ok(self.script.lock().unwrap().progress.clone())
    }

    async fn fetch_leaderboard(&self) -> Result<Leaderboard> {
        self.record("fetch_leaderboard");
        self.pause().await;
        Ok(Leaderboard::default())
    }
}
