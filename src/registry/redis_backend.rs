//! Redis-backed subscription store.
//!
//! Layout under the configured prefix:
//! - `{prefix}:records` hash, key -> JSON record
//! - `{prefix}:order` sorted set, key scored by first-insert sequence
//! - `{prefix}:seq` counter feeding the sequence

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::RedisPool;

use super::backend::{validated_key, RegistryError, SubscriptionStore};
use super::types::SubscriptionRecord;

/// Redis-backed subscription store
pub struct RedisSubscriptionStore {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisSubscriptionStore {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    fn records_key(&self) -> String {
        format!("{}:records", self.prefix)
    }

    fn order_key(&self) -> String {
        format!("{}:order", self.prefix)
    }

    fn seq_key(&self) -> String {
        format!("{}:seq", self.prefix)
    }
}

fn decode(key: &str, raw: &str) -> Option<SubscriptionRecord> {
    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Skipping undecodable subscription record");
            None
        }
    }
}

#[async_trait]
impl SubscriptionStore for RedisSubscriptionStore {
    fn backend_type(&self) -> &'static str {
        "redis"
    }

    async fn upsert(&self, record: SubscriptionRecord) -> Result<usize, RegistryError> {
        let key = validated_key(&record)?;
        let json = serde_json::to_string(&record)?;
        let (records_key, order_key, seq_key) = (self.records_key(), self.order_key(), self.seq_key());

        let count: usize = self
            .pool
            .execute(|mut conn| async move {
                let seq: i64 = redis::cmd("INCR").arg(&seq_key).query_async(&mut conn).await?;

                // ZADD NX keeps the original position of a replaced record
                let (count,): (usize,) = redis::pipe()
                    .atomic()
                    .hset(&records_key, &key, &json)
                    .ignore()
                    .cmd("ZADD")
                    .arg(&order_key)
                    .arg("NX")
                    .arg(seq)
                    .arg(&key)
                    .ignore()
                    .hlen(&records_key)
                    .query_async(&mut conn)
                    .await?;
                Ok(count)
            })
            .await?;

        tracing::debug!(prefix = %self.prefix, count = count, "Subscription stored in Redis");
        Ok(count)
    }

    async fn list(&self) -> Result<Vec<SubscriptionRecord>, RegistryError> {
        let (records_key, order_key) = (self.records_key(), self.order_key());

        let rows: Vec<(String, Option<String>)> = self
            .pool
            .execute(|mut conn| async move {
                let keys: Vec<String> = redis::cmd("ZRANGE")
                    .arg(&order_key)
                    .arg(0)
                    .arg(-1)
                    .query_async(&mut conn)
                    .await?;

                if keys.is_empty() {
                    return Ok(Vec::new());
                }

                let values: Vec<Option<String>> = redis::cmd("HMGET")
                    .arg(&records_key)
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await?;

                Ok(keys.into_iter().zip(values).collect())
            })
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, raw)| raw.and_then(|raw| decode(&key, &raw)))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, RegistryError> {
        let records_key = self.records_key();
        let field = key.to_string();

        let raw: Option<String> = self
            .pool
            .execute(|mut conn| async move {
                redis::cmd("HGET")
                    .arg(&records_key)
                    .arg(&field)
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        Ok(raw.and_then(|raw| decode(key, &raw)))
    }

    async fn remove(&self, key: &str) -> Result<bool, RegistryError> {
        let (records_key, order_key) = (self.records_key(), self.order_key());
        let field = key.to_string();

        let (removed,): (i64,) = self
            .pool
            .execute(|mut conn| async move {
                redis::pipe()
                    .atomic()
                    .hdel(&records_key, &field)
                    .zrem(&order_key, &field)
                    .ignore()
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        Ok(removed > 0)
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        let records_key = self.records_key();

        let count: usize = self
            .pool
            .execute(|mut conn| async move {
                redis::cmd("HLEN").arg(&records_key).query_async(&mut conn).await
            })
            .await?;

        Ok(count)
    }

    async fn clear(&self) -> Result<usize, RegistryError> {
        let (records_key, order_key) = (self.records_key(), self.order_key());

        let (cleared,): (usize,) = self
            .pool
            .execute(|mut conn| async move {
                redis::pipe()
                    .atomic()
                    .hlen(&records_key)
                    .del(&records_key)
                    .ignore()
                    .del(&order_key)
                    .ignore()
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        tracing::info!(prefix = %self.prefix, cleared = cleared, "Cleared Redis subscription registry");
        Ok(cleared)
    }
}
