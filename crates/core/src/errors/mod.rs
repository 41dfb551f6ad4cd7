//! Error types and Result alias for the rewards client

use thiserror::Error;

/// Main error type for the rewards client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The request reached the server and was declined.
    /// `success:false` envelopes and non-2xx responses both land here.
    #[error("Request rejected: {message}")]
    Rejected { status: Option<u16>, message: String },

    /// The request never reached the server, or timed out
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Build a rejection from a server message
    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Rejected {
            status,
            message: message.into(),
        }
    }

    /// True when the request did not reach the server
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::NetworkError(_))
    }

    /// HTTP status attached to the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => *status,
            _ => None,
        }
    }

    /// The raw message carried by the error, without the variant prefix.
    ///
    /// This is the text shown to the user when no friendlier mapping applies.
    pub fn message(&self) -> String {
        match self {
            Error::AuthenticationError(m)
            | Error::NetworkError(m)
            | Error::DatabaseError(m)
            | Error::InvalidData(m)
            | Error::ConfigError(m)
            | Error::Unknown(m) => m.clone(),
            Error::Rejected { message, .. } => message.clone(),
        }
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Error::rejected(Some(status.as_u16()), err.to_string());
        }
        if err.is_decode() {
            return Error::InvalidData(err.to_string());
        }
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_variant_prefix() {
        let err = Error::rejected(Some(400), "Not eligible for spin");
        assert_eq!(err.message(), "Not eligible for spin");
        assert_eq!(err.to_string(), "Request rejected: Not eligible for spin");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(Error::NetworkError("timed out".into()).is_transient());
        assert!(!Error::rejected(Some(500), "boom").is_transient());
        assert!(!Error::AuthenticationError("no token".into()).is_transient());
    }
}
