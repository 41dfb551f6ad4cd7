//! Walkathon leaderboard models

use serde::{Deserialize, Serialize};

/// Response data of `GET /api/walkathon/leaderboard`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    #[serde(default, alias = "leaderboard")]
    pub entries: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub user_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub user_id: serde_json::Value,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub steps: u64,
}

impl LeaderboardEntry {
    /// User ids arrive as numbers or strings depending on the endpoint
    pub fn user_id_str(&self) -> String {
        match &self.user_id {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
