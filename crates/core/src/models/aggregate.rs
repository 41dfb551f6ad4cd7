//! Cached aggregate identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A server-owned aggregate the client caches and refreshes wholesale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Wallet screen: coin balance and xp
    Wallet,
    /// The short "recent transactions" strip
    RecentTransactions,
    /// First page of the full transaction history
    FullTransactions,
    /// Walkathon progress (milestones reached/claimed)
    Progress,
    /// Walkathon leaderboard
    Leaderboard,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 5] = [
        AggregateKind::Wallet,
        AggregateKind::RecentTransactions,
        AggregateKind::FullTransactions,
        AggregateKind::Progress,
        AggregateKind::Leaderboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKind::Wallet => "wallet",
            AggregateKind::RecentTransactions => "recent_transactions",
            AggregateKind::FullTransactions => "full_transactions",
            AggregateKind::Progress => "progress",
            AggregateKind::Leaderboard => "leaderboard",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
