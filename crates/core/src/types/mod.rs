//! Shared type definitions and newtypes

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coins per USD used by the wallet (10 coins = $1)

/// USD amount (for clarity in function signatures)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usd(pub f64);

impl Usd {
    pub fn new(amount: f64) -> Self {
        Usd(amount)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Round to whole cents (payout denominations are sent in dollars with 2 decimals)
    pub fn rounded_to_cents(&self) -> Self {
        Usd((self.0 * 100.0).round() / 100.0)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Wallet coin balance (for clarity in function signatures)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(pub f64);

impl Coins {
    pub fn new(amount: f64) -> Self {
        Coins(amount)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// Walkathon milestone / reward tier key (the step count that unlocks it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(pub u64);

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client-generated idempotency key for a payout submission
///
/// Format: `<prefix>_<unix millis>_<9 base36 chars>`. The same value is sent
/// for every network attempt of one logical request; a new draft gets a new id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Generate a fresh id for the given product prefix
    pub fn generate(prefix: &str) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        ExternalId(format!(
            "{}_{}_{}",
            prefix,
            chrono::Utc::now().timestamp_millis(),
            suffix
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        ExternalId(value)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
