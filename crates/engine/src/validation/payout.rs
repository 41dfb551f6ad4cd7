//! Field validation for payout forms

use rewards_core::{
    Coins, Failure, Field, FieldErrors, PayoutKind, PayoutRequest, Recipient, Usd,
    ValidatedPayout,
};

pub const FUNDING_UNAVAILABLE_MESSAGE: &str = "System error: Funding source not available.";

/// Validates a payout draft against the amount and recipient rules
#[derive(Debug, Clone)]
pub struct PayoutValidator {
    minimum_usd: f64,
}

impl PayoutValidator {
    pub fn new(minimum_usd: f64) -> Self {
        Self { minimum_usd }
    }

    /// Validate the draft. `balance` is the last known wallet balance.
    ///
    /// A missing funding source or product is reported on its own, before
    /// any field messages.
    pub fn validate(&self, request: &PayoutRequest, balance: Coins) -> Result<ValidatedPayout, Failure> {
        let funding_source_id = non_empty(&request.funding_source_id);
        let product_id = non_empty(&request.product_id);
        let (Some(funding_source_id), Some(product_id)) = (funding_source_id, product_id) else {
            return Err(Failure::precondition(FUNDING_UNAVAILABLE_MESSAGE));
        };

        let mut errors = FieldErrors::new();

        let amount = match self.check_amount(request.kind, &request.amount, balance) {
            Ok(amount) => Some(amount),
            Err(message) => {
                errors.insert(Field::Amount, message);
                None
            }
        };

        let party = capitalize(request.kind.party_label());
        if let Err(message) = check_name(&party, &request.recipient.name) {
            errors.insert(Field::RecipientName, message);
        }
        if let Err(message) = check_email(&party, &request.recipient.email) {
            errors.insert(Field::RecipientEmail, message);
        }

        match amount {
            Some(amount) if errors.is_empty() => Ok(ValidatedPayout {
                external_id: request.external_id.clone(),
                kind: request.kind,
                funding_source_id,
                product_id,
                amount,
                recipient: Recipient {
                    name: request.recipient.name.trim().to_string(),
                    email: request.recipient.email.trim().to_string(),
                },
            }),
            _ => Err(Failure::fields(errors)),
        }
    }

    fn check_amount(&self, kind: PayoutKind, raw: &str, balance: Coins) -> Result<Usd, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(format!("{} is required", capitalize(kind.amount_label())));
        }

        let amount = match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v != 0.0 => v,
            _ => return Err("Please enter a valid amount".to_string()),
        };

        if amount < self.minimum_usd {
            return Err(format!(
                "Minimum {} is ${}.",
                kind.amount_label(),
                format_dollars(self.minimum_usd)
            ));
        }

        if amount > balance.as_f64() {
            return Err("Amount exceeds available balance".to_string());
        }

        Ok(Usd(amount))
    }
}

fn check_name(party: &str, raw: &str) -> Result<(), String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(format!("{} name is required", party));
    }
    if name.chars().count() < 2 {
        return Err(format!("{} name must be at least 2 characters long", party));
    }
    let allowed = |c: char| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-' || c == '\'';
    if !name.chars().all(allowed) {
        return Err(format!(
            "{} name can only contain letters, spaces, hyphens, and apostrophes",
            party
        ));
    }
    Ok(())
}

fn check_email(party: &str, raw: &str) -> Result<(), String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(format!("{} email is required", party));
    }
    if !is_valid_email(email) {
        return Err("Please enter a valid email address (e.g., user@example.com)".to_string());
    }
    Ok(())
}

/// `local@domain.tld`: local part of `[A-Za-z0-9._%+-]`, domain of
/// `[A-Za-z0-9.-]`, and a final label of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    if !local_ok {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    host_ok && tld_ok
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `5` for whole dollars, `5.50` otherwise
fn format_dollars(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}
