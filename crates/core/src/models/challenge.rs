//! Daily challenge models for the /api/daily-challenge endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    /// Play a selected game for the required window
    Game,
    /// Spin the wheel; no play window
    Spin,
}

/// Today's challenge as last loaded by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayChallenge {
    pub conversion_id: String,
    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// Response data of `POST /api/daily-challenge/complete`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeCompletion {
    #[serde(default)]
    pub rewards: Option<ChallengeRewards>,
    #[serde(default)]
    pub streak: Option<StreakSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRewards {
    #[serde(default)]
    pub coins: f64,
    #[serde(default)]
    pub xp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    #[serde(default)]
    pub current_streak: u32,
}
