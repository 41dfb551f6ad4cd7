//! Request manager configuration
//!
//! Loaded from a JSON file, overridable from the environment, and
//! persistable to the settings table. Every field has a default, so a
//! partial file (or `{}`) is a valid configuration.

use rewards_core::{Error, Result};
use rewards_networking::DEFAULT_BASE_URL;
use rewards_persistence::sqlite::{load_setting, save_setting};
use rewards_persistence::{Database, StoreTtls};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SETTINGS_KEY: &str = "manager_config";

pub const ENV_API_URL: &str = "REWARDS_API_URL";
pub const ENV_TOKEN: &str = "REWARDS_TOKEN";

/// Retry policy for actions that are safe to repeat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait between attempts (base delay when exponential)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Double the wait after every failed attempt
    #[serde(default)]
    pub exponential: bool,
}

fn default_max_attempts() -> u32 { 10 }
fn default_backoff_ms() -> u64 { 1000 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            exponential: false,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff_ms: backoff.as_millis() as u64,
            exponential: false,
        }
    }

    /// Wait after the given failed attempt (1-based) before the next one
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.backoff_ms.max(1);
        if !self.exponential || attempt <= 1 {
            return Duration::from_millis(base);
        }
        // base_ms * 2^(attempt-1), saturating
        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::ConfigError("maxAttempts must be at least 1".to_string()));
        }
        if self.backoff_ms == 0 {
            return Err(Error::ConfigError("backoffMs must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Configuration for [`RewardsManager`](crate::RewardsManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Session token; only ever read from the environment or the CLI
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Per-product payout minimum
    #[serde(default = "default_minimum_payout_usd")]
    pub minimum_payout_usd: f64,
    /// Balance required to open the withdrawal options at all
    #[serde(default = "default_withdrawal_minimum_coins")]
    pub withdrawal_minimum_coins: f64,

    #[serde(default)]
    pub spin_retry: RetryPolicy,

    #[serde(default = "default_wallet_ttl_secs")]
    pub wallet_ttl_secs: u64,
    #[serde(default = "default_transactions_ttl_secs")]
    pub transactions_ttl_secs: u64,
    #[serde(default = "default_walkathon_ttl_secs")]
    pub progress_ttl_secs: u64,
    #[serde(default = "default_walkathon_ttl_secs")]
    pub leaderboard_ttl_secs: u64,

    /// Auto-refresh interval on the walkathon screen
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum play time before a game challenge can be completed
    #[serde(default = "default_challenge_window_secs")]
    pub challenge_window_secs: u64,

    #[serde(default = "default_recent_transactions_limit")]
    pub recent_transactions_limit: u32,
    #[serde(default = "default_transactions_page_size")]
    pub transactions_page_size: u32,
}

fn default_api_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_minimum_payout_usd() -> f64 { 5.0 }
fn default_withdrawal_minimum_coins() -> f64 { 20.0 }
fn default_wallet_ttl_secs() -> u64 { 5 * 60 }
fn default_transactions_ttl_secs() -> u64 { 3 * 60 }
fn default_walkathon_ttl_secs() -> u64 { 30 }
fn default_poll_interval_secs() -> u64 { 30 }
fn default_challenge_window_secs() -> u64 { 10 * 60 }
fn default_recent_transactions_limit() -> u32 { 5 }
fn default_transactions_page_size() -> u32 { 20 }

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            minimum_payout_usd: default_minimum_payout_usd(),
            withdrawal_minimum_coins: default_withdrawal_minimum_coins(),
            spin_retry: RetryPolicy::default(),
            wallet_ttl_secs: default_wallet_ttl_secs(),
            transactions_ttl_secs: default_transactions_ttl_secs(),
            progress_ttl_secs: default_walkathon_ttl_secs(),
            leaderboard_ttl_secs: default_walkathon_ttl_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            challenge_window_secs: default_challenge_window_secs(),
            recent_transactions_limit: default_recent_transactions_limit(),
            transactions_page_size: default_transactions_page_size(),
        }
    }
}

impl ManagerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded config from {}", path.display());
        Self::from_json(&json)
    }

    /// Apply `REWARDS_API_URL` / `REWARDS_TOKEN` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            info!("API url overridden from environment");
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.spin_retry.validate()?;
        if self.minimum_payout_usd <= 0.0 {
            return Err(Error::ConfigError("minimumPayoutUsd must be positive".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::ConfigError("pollIntervalSecs must be positive".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(Error::ConfigError("apiUrl is required".to_string()));
        }
        Ok(())
    }

    pub fn ttls(&self) -> StoreTtls {
        StoreTtls {
            wallet: Duration::from_secs(self.wallet_ttl_secs),
            transactions: Duration::from_secs(self.transactions_ttl_secs),
            progress: Duration::from_secs(self.progress_ttl_secs),
            leaderboard: Duration::from_secs(self.leaderboard_ttl_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn challenge_window(&self) -> Duration {
        Duration::from_secs(self.challenge_window_secs)
    }

    /// Load the persisted config, if one was saved
    pub async fn load_from_db(db: &Database) -> Result<Option<Self>> {
        let config: Option<Self> = load_setting(db.pool(), SETTINGS_KEY).await?;
        if let Some(config) = &config {
            config.validate()?;
        }
        Ok(config)
    }

    /// Persist the config; the token is never written
    pub async fn save_to_db(&self, db: &Database) -> Result<()> {
        self.validate()?;
        save_setting(db.pool(), SETTINGS_KEY, self).await
    }
}
