//! Backend trait for subscription storage.
//!
//! The registry is the sole owner of subscription records. Backends differ
//! only in durability: memory loses everything on restart, Redis and
//! PostgreSQL survive it.

use async_trait::async_trait;
use thiserror::Error;

use super::types::SubscriptionRecord;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed record (e.g. no endpoint and no subscriber id)
    #[error("{0}")]
    Validation(String),

    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] crate::redis::PoolError),

    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Stored record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend cannot serve requests right now
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for RegistryError {
    fn from(err: redis::RedisError) -> Self {
        RegistryError::Redis(crate::redis::PoolError::Redis(err))
    }
}

/// Keyed store of push subscriptions.
///
/// # Ordering
///
/// `list` returns records in first-insertion order. Replacing a record through
/// `upsert` keeps its original position.
///
/// # Thread Safety
///
/// Implementations are shared across request handlers and dispatch calls and
/// must tolerate concurrent upsert/remove/list.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Backend identifier ("memory", "redis", "postgres")
    fn backend_type(&self) -> &'static str;

    /// Insert or replace a record by key.
    ///
    /// # Returns
    ///
    /// The total number of records after the write.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Validation` if the record has no key.
    async fn upsert(&self, record: SubscriptionRecord) -> Result<usize, RegistryError>;

    /// Snapshot of all records in insertion order.
    async fn list(&self) -> Result<Vec<SubscriptionRecord>, RegistryError>;

    /// Look up a single record.
    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, RegistryError>;

    /// Delete a record. Removing an absent key is not an error.
    ///
    /// # Returns
    ///
    /// `true` if a record was removed.
    async fn remove(&self, key: &str) -> Result<bool, RegistryError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, RegistryError>;

    /// Delete every record, returning how many were removed.
    async fn clear(&self) -> Result<usize, RegistryError>;
}

/// Reject records without a usable key.
pub(crate) fn validated_key(record: &SubscriptionRecord) -> Result<String, RegistryError> {
    let key = record.key();
    if key.is_empty() {
        return Err(RegistryError::Validation(
            "subscription requires an endpoint or subscriberId".to_string(),
        ));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_key() {
        let record = SubscriptionRecord::saas("player-1");
        assert_eq!(validated_key(&record).unwrap(), "player-1");

        let mut empty = SubscriptionRecord::saas("");
        empty.endpoint = Some(String::new());
        assert!(matches!(
            validated_key(&empty),
            Err(RegistryError::Validation(_))
        ));
    }
}
