//! In-memory subscription store.
//!
//! Records live behind a single mutex and are lost on restart. Suitable for
//! development and tests; production deployments should pick a durable backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::backend::{validated_key, RegistryError, SubscriptionStore};
use super::types::SubscriptionRecord;

#[derive(Default)]
struct Inner {
    /// key -> insertion sequence
    index: HashMap<String, u64>,
    /// insertion sequence -> record
    records: BTreeMap<u64, SubscriptionRecord>,
    next_seq: u64,
}

/// In-memory subscription store.
#[derive(Default)]
pub struct MemorySubscriptionStore {
    inner: Mutex<Inner>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the maps inconsistent
        // (every mutation is a single insert/remove pair), so recover.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, record: SubscriptionRecord) -> Result<usize, RegistryError> {
        let key = validated_key(&record)?;
        let mut inner = self.lock();

        match inner.index.get(&key).copied() {
            Some(seq) => {
                inner.records.insert(seq, record);
                tracing::debug!(key = %key, "Replaced existing subscription");
            }
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.index.insert(key.clone(), seq);
                inner.records.insert(seq, record);
                tracing::debug!(key = %key, "Stored new subscription");
            }
        }

        Ok(inner.index.len())
    }

    async fn list(&self) -> Result<Vec<SubscriptionRecord>, RegistryError> {
        Ok(self.lock().records.values().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<SubscriptionRecord>, RegistryError> {
        let inner = self.lock();
        Ok(inner
            .index
            .get(key)
            .and_then(|seq| inner.records.get(seq))
            .cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, RegistryError> {
        let mut inner = self.lock();
        match inner.index.remove(key) {
            Some(seq) => {
                inner.records.remove(&seq);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.lock().index.len())
    }

    async fn clear(&self) -> Result<usize, RegistryError> {
        let mut inner = self.lock();
        let cleared = inner.index.len();
        inner.index.clear();
        inner.records.clear();
        Ok(cleared)
    }
}
