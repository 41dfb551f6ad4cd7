//! Rewards API HTTP client with token-header authentication

use crate::backend::RewardsBackend;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, RequestBuilder, StatusCode,
};
use rewards_core::{
    error_message_from_body, ApiEnvelope, ChallengeCompletion, Error, FundingSource, Leaderboard,
    MilestoneClaimResult, MilestoneId, PayoutBody, PayoutReceipt, RedeemResult, Result,
    SpinAllowance, SpinResult, TransactionPage, TransactionQuery, WalkathonProgress,
    WalletSnapshot,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://rewardsapi.hireagent.co";

const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path prefixes served behind bearer authentication.
/// Everything else takes the token in `x-auth-token`.
const BEARER_PREFIXES: &[&str] = &[
    "/api/cash-coach",
    "/api/vip",
    "/api/payment",
    "/api/game",
    "/api/profile/notifications",
];

/// HTTP client for the rewards backend
///
/// Every response is unwrapped from the `{success, data, error, message}`
/// envelope; `success:false` and non-2xx responses surface as
/// [`Error::Rejected`], transport failures as [`Error::NetworkError`].
pub struct RewardsClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl RewardsClient {
    /// Create a client against the production API
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Create a client against a specific API root
    pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!("Failed to create HTTP client: {}", e);
                Error::NetworkError(e.to_string())
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Headers for a request to `path`
    fn headers_for(&self, path: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.token {
            let invalid = |e: reqwest::header::InvalidHeaderValue| {
                Error::AuthenticationError(format!("Token is not a valid header value: {}", e))
            };
            if BEARER_PREFIXES.iter().any(|p| path.starts_with(p)) {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", token)).map_err(invalid)?,
                );
            } else {
                headers.insert(
                    HeaderName::from_static(AUTH_TOKEN_HEADER),
                    HeaderValue::from_str(token).map_err(invalid)?,
                );
            }
        }

        Ok(headers)
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.http.get(url).headers(self.headers_for(path)?))
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.http.post(url).headers(self.headers_for(path)?).json(body))
    }

    /// Send a request and unwrap the envelope. `Ok(None)` means success
    /// without a payload, including `204 No Content`.
    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<Option<T>> {
        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", path, e);
            Error::NetworkError(e.to_string())
        })?;

        let status = response.status();
        debug!("{} responded with {}", path, status);

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        let text = response.text().await.map_err(|e| {
            error!("Failed to read body from {}: {}", path, e);
            Error::NetworkError(e.to_string())
        })?;

        let body: serde_json::Value = if is_json {
            serde_json::from_str(&text).map_err(|e| {
                error!("Failed to parse body from {}: {}", path, e);
                Error::InvalidData(e.to_string())
            })?
        } else {
            json!({ "message": text })
        };

        if !status.is_success() {
            let message = error_message_from_body(&body, status.as_u16());
            warn!("{} rejected with {}: {}", path, status, message);
            return Err(Error::rejected(Some(status.as_u16()), message));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_value(body).map_err(|e| {
            error!("Unexpected response shape from {}: {}", path, e);
            Error::InvalidData(e.to_string())
        })?;

        envelope.into_result(Some(status.as_u16()))
    }

    /// Like [`send`](Self::send) but a payload is required
    async fn send_data<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        self.send(path, request).await?.ok_or_else(|| {
            error!("{} returned success without data", path);
            Error::InvalidData(format!("{} returned no data", path))
        })
    }

    /// Create a payout order
    #[instrument(skip(self, body), fields(external_id = %body.external_id))]
    pub async fn create_payout(&self, body: &PayoutBody) -> Result<PayoutReceipt> {
        let path = "/api/payouts/create";
        let payload = serde_json::to_value(body)?;
        debug!("Submitting payout of {}", body.reward.value.denomination);

        let receipt: Option<PayoutReceipt> = self.send(path, self.post(path, &payload)?).await?;
        Ok(receipt.unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn get_payout_status(&self, order_id: &str) -> Result<PayoutReceipt> {
        let path = format!("/api/payouts/{}/status", order_id);
        self.send_data(&path, self.get(&path)?).await
    }

    /// Funding sources the account can pay out from
    #[instrument(skip(self))]
    pub async fn get_funding_sources(&self) -> Result<Vec<FundingSource>> {
        let path = "/api/payouts/funding-sources";
        let request = self
            .get(path)?
            .query(&[("currency_code", "USD"), ("country", "US")]);
        let sources: Option<Vec<FundingSource>> = self.send(path, request).await?;
        let sources = sources.unwrap_or_default();
        debug!("Fetched {} funding sources", sources.len());
        Ok(sources)
    }

    /// Claim one walkathon milestone.
    ///
    /// The endpoint nests a second `success` flag inside `data`; a false
    /// value there is a rejection like any other.
    #[instrument(skip(self))]
    pub async fn claim_walkathon_milestone(&self, milestone: MilestoneId) -> Result<MilestoneClaimResult> {
        let path = "/api/walkathon/claim";
        let payload = json!({ "stepMilestone": milestone });

        let result: MilestoneClaimResult =
            self.send_data(path, self.post(path, &payload)?).await?;

        if !result.success {
            let message = result
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Failed to claim reward".to_string());
            warn!("Milestone {} claim declined: {}", milestone, message);
            return Err(Error::rejected(Some(200), message));
        }

        debug!("Milestone {} claimed", milestone);
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn spin_wheel(&self) -> Result<SpinResult> {
        let path = "/api/spin/spin";
        self.send_data(path, self.post(path, &json!({}))?).await
    }

    #[instrument(skip(self))]
    pub async fn redeem_spin_reward(&self, spin_id: &str) -> Result<RedeemResult> {
        let path = "/api/spin/redeem";
        let payload = json!({ "spinId": spin_id });
        self.send_data(path, self.post(path, &payload)?).await
    }

    #[instrument(skip(self))]
    pub async fn get_spin_status(&self) -> Result<SpinAllowance> {
        let path = "/api/spin/status";
        self.send_data(path, self.get(path)?).await
    }

    #[instrument(skip(self))]
    pub async fn complete_daily_challenge(&self, conversion_id: &str) -> Result<ChallengeCompletion> {
        let path = "/api/daily-challenge/complete";
        let payload = json!({ "conversionId": conversion_id });
        let completion: Option<ChallengeCompletion> =
            self.send(path, self.post(path, &payload)?).await?;
        Ok(completion.unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn get_wallet_screen(&self) -> Result<WalletSnapshot> {
        let path = "/api/wallet-screen";
        self.send_data(path, self.get(path)?).await
    }

    #[instrument(skip(self))]
    pub async fn get_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        let path = "/api/wallet/transactions";
        let request = match query {
            TransactionQuery::Recent { limit } => self.get(path)?.query(&[("limit", limit)]),
            TransactionQuery::Page { page, limit, kind } => self.get(path)?.query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("type", kind.clone()),
            ]),
        };
        self.send_data(path, request).await
    }

    #[instrument(skip(self))]
    pub async fn get_walkathon_progress(&self) -> Result<WalkathonProgress> {
        let path = "/api/walkathon/progress";
        self.send_data(path, self.get(path)?).await
    }

    #[instrument(skip(self))]
    pub async fn get_walkathon_leaderboard(&self) -> Result<Leaderboard> {
        let path = "/api/walkathon/leaderboard";
        self.send_data(path, self.get(path)?).await
    }
}

#[async_trait]
impl RewardsBackend for RewardsClient {
    async fn submit_payout(&self, body: &PayoutBody) -> Result<PayoutReceipt> {
        self.create_payout(body).await
    }

    async fn payout_status(&self, order_id: &str) -> Result<PayoutReceipt> {
        self.get_payout_status(order_id).await
    }

    async fn claim_milestone(&self, milestone: MilestoneId) -> Result<MilestoneClaimResult> {
        self.claim_walkathon_milestone(milestone).await
    }

    async fn spin(&self) -> Result<SpinResult> {
        self.spin_wheel().await
    }

    async fn redeem_spin(&self, spin_id: &str) -> Result<RedeemResult> {
        self.redeem_spin_reward(spin_id).await
    }

    async fn spin_status(&self) -> Result<SpinAllowance> {
        self.get_spin_status().await
    }

    async fn complete_challenge(&self, conversion_id: &str) -> Result<ChallengeCompletion> {
        self.complete_daily_challenge(conversion_id).await
    }

    async fn fetch_wallet(&self) -> Result<WalletSnapshot> {
        self.get_wallet_screen().await
    }

    async fn fetch_transactions(&self, query: &TransactionQuery) -> Result<TransactionPage> {
        self.get_transactions(query).await
    }

    async fn fetch_progress(&self) -> Result<WalkathonProgress> {
        self.get_walkathon_progress().await
    }

    async fn fetch_leaderboard(&self) -> Result<Leaderboard> {
        self.get_walkathon_leaderboard().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_goes_in_auth_token_header() {
        let client = RewardsClient::with_base_url("http://localhost:9", Some("tok".into())).unwrap();
        let headers = client.headers_for("/api/wallet-screen").unwrap();
        assert_eq!(headers.get(AUTH_TOKEN_HEADER).unwrap(), "tok");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_bearer_prefixes_use_authorization() {
        let client = RewardsClient::with_base_url("http://localhost:9/", Some("tok".into())).unwrap();
        let headers = client.headers_for("/api/payment/methods").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(client.base_url(), "http://localhost:9");
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let client = RewardsClient::with_base_url("http://localhost:9", Some(String::new())).unwrap();
        assert!(!client.has_token());
        let headers = client.headers_for("/api/spin/status").unwrap();
        assert!(headers.get(AUTH_TOKEN_HEADER).is_none());
    }
}
