//! Payout journal: one row per external id

use chrono::Utc;
use rewards_core::{Error, PayoutKind, PayoutReceipt, PayoutStatus, Result, ValidatedPayout};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Journal row for a payout submission
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PayoutRow {
    pub external_id: String,
    pub kind: String,
    pub product_id: Option<String>,
    pub amount_usd: f64,
    pub status: String,
    pub message: Option<String>,
    pub order_id: Option<String>,
    pub created_at: String,
    pub settled_at: Option<String>,
}

impl PayoutRow {
    pub fn kind(&self) -> Option<PayoutKind> {
        self.kind.parse().ok()
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == PayoutStatus::Succeeded.as_str()
    }

    pub fn is_failed(&self) -> bool {
        self.status == PayoutStatus::Failed.as_str()
    }
}

/// Record that a payout is about to be sent.
///
/// A row that already settled as succeeded is left untouched.
pub async fn record_submitting(pool: &SqlitePool, payout: &ValidatedPayout) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payouts (external_id, kind, product_id, amount_usd, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(external_id) DO UPDATE SET status = ?5, message = NULL
        WHERE payouts.status != 'succeeded'
        "#,
    )
    .bind(payout.external_id.as_str())
    .bind(payout.kind.as_str())
    .bind(&payout.product_id)
    .bind(payout.amount.as_f64())
    .bind(PayoutStatus::Submitting.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

pub async fn record_succeeded(
    pool: &SqlitePool,
    external_id: &str,
    receipt: &PayoutReceipt,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE payouts
        SET status = ?, order_id = ?, message = ?, settled_at = ?
        WHERE external_id = ?
        "#,
    )
    .bind(PayoutStatus::Succeeded.as_str())
    .bind(&receipt.order_id)
    .bind(&receipt.message)
    .bind(Utc::now().to_rfc3339())
    .bind(external_id)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

pub async fn record_failed(pool: &SqlitePool, external_id: &str, message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE payouts
        SET status = ?, message = ?, settled_at = ?
        WHERE external_id = ? AND status != 'succeeded'
        "#,
    )
    .bind(PayoutStatus::Failed.as_str())
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(external_id)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

pub async fn get_payout(pool: &SqlitePool, external_id: &str) -> Result<Option<PayoutRow>> {
    let row = sqlx::query_as::<_, PayoutRow>(
        r#"
        SELECT external_id, kind, product_id, amount_usd, status, message, order_id,
               created_at, settled_at
        FROM payouts
        WHERE external_id = ?
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row)
}

/// Most recent journal rows, newest first
pub async fn recent_payouts(pool: &SqlitePool, limit: u32) -> Result<Vec<PayoutRow>> {
    let rows = sqlx::query_as::<_, PayoutRow>(
        r#"
        SELECT external_id, kind, product_id, amount_usd, status, message, order_id,
               created_at, settled_at
        FROM payouts
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use rewards_core::{ExternalId, Recipient, Usd};

    fn payout(id: &str) -> ValidatedPayout {
        ValidatedPayout {
            external_id: ExternalId::from(id.to_string()),
            kind: PayoutKind::GiftCard,
            funding_source_id: "fs_1".to_string(),
            product_id: "prod_amazon".to_string(),
            amount: Usd(10.0),
            recipient: Recipient {
                name: "Ann Lee".to_string(),
                email: "ann@example.com".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_journal_lifecycle() {
        let db = Database::connect_in_memory().await.unwrap();
        let pool = db.pool();

        record_submitting(pool, &payout("gift_card_1_a")).await.unwrap();
        let row = get_payout(pool, "gift_card_1_a").await.unwrap().unwrap();
        assert_eq!(row.status, "submitting");
        assert_eq!(row.kind(), Some(PayoutKind::GiftCard));

        let receipt = PayoutReceipt {
            order_id: Some("ord_9".to_string()),
            ..Default::default()
        };
        record_succeeded(pool, "gift_card_1_a", &receipt).await.unwrap();

        // a late failure must not overwrite success
        record_failed(pool, "gift_card_1_a", "timeout").await.unwrap();
        record_submitting(pool, &payout("gift_card_1_a")).await.unwrap();

        let row = get_payout(pool, "gift_card_1_a").await.unwrap().unwrap();
        assert!(row.is_succeeded());
        assert_eq!(row.order_id.as_deref(), Some("ord_9"));
    }

    #[tokio::test]
    async fn test_failed_row_keeps_message() {
        let db = Database::connect_in_memory().await.unwrap();
        let pool = db.pool();

        record_submitting(pool, &payout("charity_2_b")).await.unwrap();
        record_failed(pool, "charity_2_b", "Insufficient funds").await.unwrap();

        let row = get_payout(pool, "charity_2_b").await.unwrap().unwrap();
        assert!(row.is_failed());
        assert_eq!(row.message.as_deref(), Some("Insufficient funds"));
        assert_eq!(recent_payouts(pool, 10).await.unwrap().len(), 1);
        assert!(get_payout(pool, "missing").await.unwrap().is_none());
    }
}
