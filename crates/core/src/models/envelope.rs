//! The uniform `{success, data?, error?, message?}` response envelope

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Envelope every backend endpoint responds with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Convert the envelope into a typed result.
    ///
    /// `success:false` becomes [`Error::Rejected`] carrying `error`, else `message`.
    pub fn into_result(self, status: Option<u16>) -> Result<Option<T>> {
        if self.success {
            return Ok(self.data);
        }
        let message = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "Request failed".to_string());
        Err(Error::rejected(status, message))
    }

    /// Like [`into_result`](Self::into_result) but requires a `data` payload
    pub fn into_data(self, status: Option<u16>) -> Result<T> {
        self.into_result(status)?
            .ok_or_else(|| Error::InvalidData("Response envelope has no data".to_string()))
    }
}

/// Extract the human-readable message from a non-2xx response body.
///
/// Preference order: `error`, first `errors[].msg`, `message`, then a
/// status-code fallback.
pub fn error_message_from_body(body: &serde_json::Value, status: u16) -> String {
    let text = |v: Option<&serde_json::Value>| {
        v.and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    text(body.get("error"))
        .or_else(|| text(body.get("errors").and_then(|e| e.get(0)).and_then(|e| e.get("msg"))))
        .or_else(|| text(body.get("message")))
        .unwrap_or_else(|| format!("HTTP error! status: {}", status))
}
