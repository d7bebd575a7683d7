//! PostgreSQL-based subscription store.
//!
//! Records are stored as JSONB in `push_subscriptions`. The `seq` column is
//! assigned on first insert and never touched by upserts, so ordering by it
//! yields insertion order.

use async_trait::async_trait;
use sqlx::PgPool;

use super::backend::{validated_key, RegistryError, SubscriptionStore};
use super::types::SubscriptionRecord;

/// PostgreSQL-based subscription store
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode(key: &str, value: serde_json::Value) -> Option<SubscriptionRecord> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Skipping undecodable subscription row");
            None
        }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn upsert(&self, record: SubscriptionRecord) -> Result<usize, RegistryError> {
        let key = validated_key(&record)?;
        let value = serde_json::to_value(&record)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (key, record)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
            SET record = EXCLUDED.record, updated_at = NOW()
            "#,
        )
        .bind(&key)
        .bind(&value)
        .execute(&mut *tx)
        .await?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM push_subscriptions")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(key = %key, count = count, "Subscription stored in PostgreSQL");
        Ok(count as usize)
    }

    async fn list(&self) -> Result<Vec<SubscriptionRecord>, RegistryError> {
        let rows: Vec<(String, serde_json::Value)> =
            sqlx::query_as("SELECT key, record FROM push_subscriptions ORDER BY seq ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| decode(&key, value))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, RegistryError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT record FROM push_subscriptions WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(value,)| decode(key, value)))
    }

    async fn remove(&self, key: &str) -> Result<bool, RegistryError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM push_subscriptions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }

    async fn clear(&self) -> Result<usize, RegistryError> {
        let result = sqlx::query("DELETE FROM push_subscriptions")
            .execute(&self.pool)
            .await?;

        let cleared = result.rows_affected() as usize;
        tracing::info!(cleared = cleared, "Cleared PostgreSQL subscription registry");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_row() {
        let value = json!({
            "endpoint": "https://push.example/1",
            "keys": { "p256dh": "BPk", "auth": "YXV0aA" },
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let record = decode("https://push.example/1", value).unwrap();
        assert_eq!(record.key(), "https://push.example/1");

        assert!(decode("bad", json!({"createdAt": 5})).is_none());
    }
}
