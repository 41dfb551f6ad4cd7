//! JSON values in the key/value settings table

use rewards_core::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;

pub async fn load_setting<T: DeserializeOwned>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let json: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub async fn save_setting<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = ?2",
    )
    .bind(key)
    .bind(&json)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde_json::json;

    #[tokio::test]
    async fn test_settings_upsert() {
        let db = Database::connect_in_memory().await.unwrap();
        let pool = db.pool();

        assert!(load_setting::<serde_json::Value>(pool, "manager_config")
            .await
            .unwrap()
            .is_none());

        save_setting(pool, "manager_config", &json!({"minimumPayoutUsd": 5.0}))
            .await
            .unwrap();
        save_setting(pool, "manager_config", &json!({"minimumPayoutUsd": 10.0}))
            .await
            .unwrap();

        let value: serde_json::Value = load_setting(pool, "manager_config").await.unwrap().unwrap();
        assert_eq!(value["minimumPayoutUsd"], 10.0);
    }
}
