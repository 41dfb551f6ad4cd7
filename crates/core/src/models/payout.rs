//! Payout models for the /api/payouts endpoints

use crate::types::{ExternalId, Usd};
use serde::{Deserialize, Serialize};

/// The withdrawal paths offered by the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    GiftCard,
    Charity,
    DebitCard,
    MoneyTransfer,
}

impl PayoutKind {
    /// Prefix used when generating the external id
    pub fn id_prefix(&self) -> &'static str {
        match self {
            PayoutKind::GiftCard => "gift_card",
            PayoutKind::Charity => "charity",
            PayoutKind::DebitCard => "debit_card",
            PayoutKind::MoneyTransfer => "money_transfer",
        }
    }

    /// How the amount field is referred to in messages
    pub fn amount_label(&self) -> &'static str {
        match self {
            PayoutKind::GiftCard => "gift card amount",
            PayoutKind::Charity => "donation amount",
            PayoutKind::DebitCard | PayoutKind::MoneyTransfer => "withdrawal amount",
        }
    }

    /// How the person receiving the payout is referred to
    pub fn party_label(&self) -> &'static str {
        match self {
            PayoutKind::Charity => "donor",
            _ => "recipient",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.id_prefix()
    }
}

impl std::str::FromStr for PayoutKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "gift_card" | "gift-card" => Ok(PayoutKind::GiftCard),
            "charity" => Ok(PayoutKind::Charity),
            "debit_card" | "debit-card" => Ok(PayoutKind::DebitCard),
            "money_transfer" | "money-transfer" => Ok(PayoutKind::MoneyTransfer),
            other => Err(crate::Error::InvalidData(format!("Unknown payout kind: {}", other))),
        }
    }
}

/// Lifecycle of a payout request within one modal instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Draft,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Succeeded | PayoutStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Draft => "draft",
            PayoutStatus::Validating => "validating",
            PayoutStatus::Submitting => "submitting",
            PayoutStatus::Succeeded => "succeeded",
            PayoutStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// What the user typed into a payout form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutForm {
    /// Raw amount text, parsed during validation
    pub amount: String,
    pub recipient_name: String,
    pub recipient_email: String,
    /// Selected reward product (gift card SKU, charity id, card product, transfer method)
    pub product_id: Option<String>,
    /// Payment rail backing the payout, supplied by the payment provider
    pub funding_source_id: Option<String>,
}

/// A payout draft as owned by one payout modal
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutRequest {
    pub external_id: ExternalId,
    pub kind: PayoutKind,
    pub funding_source_id: Option<String>,
    pub product_id: Option<String>,
    pub amount: String,
    pub recipient: Recipient,
    pub status: PayoutStatus,
}

impl PayoutRequest {
    /// Fresh draft with a new external id
    pub fn draft(kind: PayoutKind) -> Self {
        Self {
            external_id: ExternalId::generate(kind.id_prefix()),
            kind,
            funding_source_id: None,
            product_id: None,
            amount: String::new(),
            recipient: Recipient::default(),
            status: PayoutStatus::Draft,
        }
    }

    /// Copy the current form contents into the draft
    pub fn fill(&mut self, form: &PayoutForm) {
        self.amount = form.amount.clone();
        self.recipient = Recipient {
            name: form.recipient_name.clone(),
            email: form.recipient_email.clone(),
        };
        self.product_id = form.product_id.clone();
        self.funding_source_id = form.funding_source_id.clone();
    }
}

/// A payout that passed validation and may be sent
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayout {
    pub external_id: ExternalId,
    pub kind: PayoutKind,
    pub funding_source_id: String,
    pub product_id: String,
    pub amount: Usd,
    pub recipient: Recipient,
}

impl ValidatedPayout {
    /// Wire body for `POST /api/payouts/create`
    pub fn to_body(&self) -> PayoutBody {
        PayoutBody {
            external_id: self.external_id.as_str().to_string(),
            payment: PaymentRef {
                funding_source_id: self.funding_source_id.clone(),
            },
            reward: RewardSpec {
                value: RewardValue {
                    denomination: self.amount.rounded_to_cents().as_f64(),
                    currency_code: "USD".to_string(),
                },
                delivery: Delivery {
                    method: "EMAIL".to_string(),
                },
                recipient: Recipient {
                    name: self.recipient.name.trim().to_string(),
                    email: self.recipient.email.trim().to_string(),
                },
                products: vec![self.product_id.clone()],
            },
        }
    }
}

/// Request body for `POST /api/payouts/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutBody {
    pub external_id: String,
    pub payment: PaymentRef,
    pub reward: RewardSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRef {
    pub funding_source_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSpec {
    pub value: RewardValue,
    pub delivery: Delivery,
    pub recipient: Recipient,
    pub products: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardValue {
    pub denomination: f64,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub method: String,
}

/// Response data of payout create / status calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutReceipt {
    #[serde(default, alias = "order_id", alias = "id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A funding source listed by `GET /api/payouts/funding-sources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSource {
    pub id: String,
    #[serde(default)]
    pub method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_body_wire_shape() {
        let payout = ValidatedPayout {
            external_id: ExternalId::from("gift_card_1_abc".to_string()),
            kind: PayoutKind::GiftCard,
            funding_source_id: "fs_1".into(),
            product_id: "SKU-AMZ".into(),
            amount: Usd(25.0),
            recipient: Recipient {
                name: " Jane Doe ".into(),
                email: "jane@example.com".into(),
            },
        };
        let json = serde_json::to_value(payout.to_body()).unwrap();
        assert_eq!(json["external_id"], "gift_card_1_abc");
        assert_eq!(json["payment"]["funding_source_id"], "fs_1");
        assert_eq!(json["reward"]["value"]["denomination"], 25.0);
        assert_eq!(json["reward"]["value"]["currency_code"], "USD");
        assert_eq!(json["reward"]["delivery"]["method"], "EMAIL");
        assert_eq!(json["reward"]["recipient"]["name"], "Jane Doe");
        assert_eq!(json["reward"]["products"][0], "SKU-AMZ");
    }

    #[test]
    fn test_new_drafts_get_new_ids() {
        let a = PayoutRequest::draft(PayoutKind::Charity);
        let b = PayoutRequest::draft(PayoutKind::Charity);
        assert_ne!(a.external_id, b.external_id);
        assert!(a.external_id.as_str().starts_with("charity_"));
        assert_eq!(a.status, PayoutStatus::Draft);
    }
}
