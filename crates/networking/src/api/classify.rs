//! Maps backend failures to user-facing messages
//!
//! This is the only place raw server text is inspected. Everything past this
//! boundary sees a [`Failure`] with a stable classification.

use rewards_core::{Error, ErrorClass, Failure, PayoutKind};

pub const NETWORK_MESSAGE: &str =
    "Network error. Please check your internet connection and try again.";
pub const AUTH_MESSAGE: &str = "Authentication error. Please log in again.";

/// Classify a failed payout submission.
///
/// Rules are checked in order against the server text. When the server sent
/// no text, the HTTP status stands in for it; unmatched text is shown as-is.
pub fn classify_payout(err: &Error, kind: PayoutKind) -> Failure {
    if err.is_transient() {
        return Failure::new(ErrorClass::TransientNetwork, NETWORK_MESSAGE);
    }

    let class = ErrorClass::ServerRejection { status: err.status() };
    let text = match_text(err);
    if text.is_empty() {
        return Failure::new(class, fallback_message(kind));
    }

    let party = kind.party_label();
    let has = |needle: &str| text.contains(needle);

    let message = if has("400") || has("Bad Request") {
        format!(
            "Invalid {} information. Please check the {} name and email address.",
            party, party
        )
    } else if has("401") || has("Unauthorized") {
        AUTH_MESSAGE.to_string()
    } else if has("403") || has("Forbidden") {
        "You do not have permission to perform this action.".to_string()
    } else if has("404") || has("Not Found") {
        "Service temporarily unavailable. Please try again later.".to_string()
    } else if has("500") || has("Internal Server Error") {
        "Server error. Please try again later.".to_string()
    } else if has("email") || has("Email") {
        "Invalid email address. Please enter a valid email.".to_string()
    } else if has(party) || has("name") {
        format!(
            "Invalid {} name. Please use only letters, spaces, hyphens, and apostrophes.",
            party
        )
    } else {
        text
    };

    Failure::new(class, message)
}

/// Classify a failed claim, spin, or challenge call.
///
/// Server text is shown verbatim; `fallback` covers an empty rejection.
pub fn classify(err: &Error, fallback: &str) -> Failure {
    match err {
        e if e.is_transient() => Failure::new(ErrorClass::TransientNetwork, NETWORK_MESSAGE),
        Error::AuthenticationError(_) => Failure::new(
            ErrorClass::ServerRejection { status: Some(401) },
            AUTH_MESSAGE,
        ),
        e if e.status() == Some(401) => Failure::new(
            ErrorClass::ServerRejection { status: Some(401) },
            AUTH_MESSAGE,
        ),
        e => {
            let message = e.message();
            let message = if message.trim().is_empty() {
                fallback.to_string()
            } else {
                message
            };
            Failure::new(ErrorClass::ServerRejection { status: e.status() }, message)
        }
    }
}

fn match_text(err: &Error) -> String {
    let message = err.message();
    if !message.trim().is_empty() {
        return message;
    }
    err.status().map(|s| s.to_string()).unwrap_or_default()
}

fn fallback_message(kind: PayoutKind) -> &'static str {
    match kind {
        PayoutKind::GiftCard => "Failed to process gift card request.",
        PayoutKind::Charity => "Failed to process donation.",
        PayoutKind::DebitCard => "Failed to process prepaid card request.",
        PayoutKind::MoneyTransfer => "Failed to process money transfer.",
    }
}
