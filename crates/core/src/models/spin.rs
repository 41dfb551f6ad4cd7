//! Spin-wheel models for the /api/spin endpoints

use super::wallet::deserialize_f64_lenient;
use crate::errors::{Error, Result};
use crate::types::Coins;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Coins,
    Xp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinReward {
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub amount: f64,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
}

/// Server-side state of a spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinStatus {
    /// Reward reserved, needs an explicit redeem call
    Pending,
    /// Reward already credited by the server
    Completed,
}

/// Response data of `POST /api/spin/spin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    pub status: SpinStatus,
    #[serde(default)]
    pub spin_id: Option<String>,
    #[serde(default)]
    pub reward: Option<SpinReward>,
}

/// Response data of `POST /api/spin/redeem`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResult {
    #[serde(default, deserialize_with = "deserialize_coins")]
    pub new_balance: Coins,
    #[serde(default)]
    pub reward: Option<SpinReward>,
}

fn deserialize_coins<'de, D>(deserializer: D) -> std::result::Result<Coins, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_f64_lenient(deserializer).map(Coins)
}

/// Response data of `GET /api/spin/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinAllowance {
    #[serde(default)]
    pub can_spin: bool,
    #[serde(default)]
    pub remaining_spins: u32,
    #[serde(default)]
    pub cooldown_seconds: u64,
}

impl SpinAllowance {
    pub fn allows_spin(&self) -> bool {
        self.can_spin && self.remaining_spins > 0
    }
}

/// Client-side redemption progress of a spin reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RedemptionState {
    None,
    Pending { spin_id: String },
    Redeemed,
}

/// One spin as tracked by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinAttempt {
    pub reward: Option<SpinReward>,
    pub redemption: RedemptionState,
    /// Balance reported by the redeem call, when one was made
    pub new_balance: Option<Coins>,
}

impl SpinAttempt {
    /// Build the attempt from a spin response.
    ///
    /// A pending spin must carry a spin id; a completed spin is already redeemed.
    pub fn from_result(result: SpinResult) -> Result<Self> {
        let redemption = match (result.status, result.spin_id) {
            (SpinStatus::Pending, Some(spin_id)) if !spin_id.is_empty() => {
                RedemptionState::Pending { spin_id }
            }
            (SpinStatus::Pending, _) => {
                return Err(Error::InvalidData(
                    "Pending spin returned without a spinId".to_string(),
                ))
            }
            (SpinStatus::Completed, _) => RedemptionState::Redeemed,
        };
        Ok(Self {
            reward: result.reward,
            redemption,
            new_balance: None,
        })
    }

    pub fn spin_id(&self) -> Option<&str> {
        match &self.redemption {
            RedemptionState::Pending { spin_id } => Some(spin_id),
            _ => None,
        }
    }

    pub fn is_redeemed(&self) -> bool {
        self.redemption == RedemptionState::Redeemed
    }

    /// Record a successful redeem call. Redeemed is terminal.
    pub fn mark_redeemed(&mut self, redeem: RedeemResult) {
        if redeem.reward.is_some() {
            self.reward = redeem.reward;
        }
        self.new_balance = Some(redeem.new_balance);
        self.redemption = RedemptionState::Redeemed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_spin_requires_id() {
        let result: SpinResult =
            serde_json::from_str(r#"{"status":"pending","reward":{"amount":25,"type":"coins"}}"#).unwrap();
        assert!(SpinAttempt::from_result(result).is_err());
    }

    #[test]
    fn test_pending_then_redeemed() {
        let result: SpinResult = serde_json::from_str(
            r#"{"status":"pending","spinId":"sp_1","reward":{"amount":"25","type":"coins"}}"#,
        )
        .unwrap();
        let mut attempt = SpinAttempt::from_result(result).unwrap();
        assert_eq!(attempt.spin_id(), Some("sp_1"));

        attempt.mark_redeemed(RedeemResult {
            new_balance: Coins(125.0),
            reward: None,
        });
        assert!(attempt.is_redeemed());
        assert_eq!(attempt.spin_id(), None);
        assert_eq!(attempt.reward.as_ref().unwrap().amount, 25.0);
    }

    #[test]
    fn test_completed_spin_is_already_redeemed() {
        let result: SpinResult =
            serde_json::from_str(r#"{"status":"completed","reward":{"amount":10,"type":"xp"}}"#).unwrap();
        let attempt = SpinAttempt::from_result(result).unwrap();
        assert!(attempt.is_redeemed());
    }
}
