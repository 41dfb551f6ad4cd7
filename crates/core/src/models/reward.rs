//! Walkathon milestone models for the /api/walkathon endpoints

use super::wallet::deserialize_f64_lenient;
use crate::types::MilestoneId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Claim state of one milestone. Ordered: a milestone only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    #[default]
    Locked,
    Reached,
    Claimed,
}

/// Response data of `GET /api/walkathon/progress`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkathonProgress {
    #[serde(default)]
    pub total_steps: u64,
    /// Every reward tier of the walkathon
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Tiers reached but not yet claimed
    #[serde(default)]
    pub available_rewards: Vec<Milestone>,
    /// Tiers already claimed; the server sends either bare numbers or records
    #[serde(default)]
    pub rewards_claimed: Vec<ClaimedReward>,
}

impl WalkathonProgress {
    /// The server's view of a milestone's claim state
    pub fn state_of(&self, milestone: MilestoneId) -> ClaimState {
        if self.rewards_claimed.iter().any(|c| c.milestone() == milestone) {
            ClaimState::Claimed
        } else if self.available_rewards.iter().any(|m| m.step_milestone == milestone) {
            ClaimState::Reached
        } else {
            ClaimState::Locked
        }
    }

    /// Every milestone mentioned anywhere in the payload
    pub fn known_milestones(&self) -> Vec<MilestoneId> {
        let mut seen = HashSet::new();
        let mut ids: Vec<MilestoneId> = self
            .milestones
            .iter()
            .chain(self.available_rewards.iter())
            .map(|m| m.step_milestone)
            .chain(self.rewards_claimed.iter().map(ClaimedReward::milestone))
            .filter(|id| seen.insert(*id))
            .collect();
        ids.sort();
        ids
    }
}

/// A walkathon reward tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub step_milestone: MilestoneId,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub coin_reward: f64,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub xp_reward: f64,
}

/// Entry of `rewardsClaimed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimedReward {
    Milestone(MilestoneId),
    Record {
        #[serde(rename = "stepMilestone")]
        step_milestone: MilestoneId,
        #[serde(rename = "claimedAt", default)]
        claimed_at: Option<String>,
    },
}

impl ClaimedReward {
    pub fn milestone(&self) -> MilestoneId {
        match self {
            ClaimedReward::Milestone(id) => *id,
            ClaimedReward::Record { step_milestone, .. } => *step_milestone,
        }
    }
}

/// Response data of `POST /api/walkathon/claim`
///
/// The backend nests a second `success` flag inside `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneClaimResult {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reward: Option<ClaimedAmount>,
    #[serde(default)]
    pub transaction: Option<ClaimTransaction>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedAmount {
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub coins: f64,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub xp_reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimTransaction {
    #[serde(alias = "_id")]
    pub id: String,
}
