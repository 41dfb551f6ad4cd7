//! Wallet-related models for /api/wallet-screen and /api/wallet/transactions

use crate::types::Coins;
use serde::{Deserialize, Serialize};

/// Response data of `GET /api/wallet-screen`
///
/// Carries both the coin balance and the XP counters, so one refresh
/// covers the balance and xp aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    #[serde(default)]
    pub wallet: WalletBalance,
    #[serde(default)]
    pub xp: XpStatus,
}

impl WalletSnapshot {
    pub fn balance(&self) -> Coins {
        self.wallet.balance
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    #[serde(default, deserialize_with = "deserialize_coins")]
    pub balance: Coins,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpStatus {
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub current: f64,
    #[serde(default = "default_level")]
    pub level: u32,
}

impl Default for XpStatus {
    fn default() -> Self {
        Self {
            current: 0.0,
            level: default_level(),
        }
    }
}

fn default_level() -> u32 {
    1
}

/// Which transaction listing to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionQuery {
    /// Wallet screen "recent" strip
    Recent { limit: u32 },
    /// Paginated full history
    Page { page: u32, limit: u32, kind: String },
}

/// Response data of `GET /api/wallet/transactions`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    #[serde(default)]
    pub transactions: Vec<WalletTransaction>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub page: Option<u32>,
}

/// A single wallet ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub amount: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn deserialize_coins<'de, D>(deserializer: D) -> std::result::Result<Coins, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_f64_lenient(deserializer).map(Coins)
}

/// Deserialize an f64 that may arrive as a number, a numeric string, or null
pub(crate) fn deserialize_f64_lenient<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct F64Lenient;

    impl<'de> de::Visitor<'de> for F64Lenient {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number, numeric string, or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<f64, E> {
            v.parse::<f64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<f64, E> {
            Ok(0.0)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<f64, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(F64Lenient)
}
