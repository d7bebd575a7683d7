//! Subscription store factory

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::postgres::PostgresPool;
use crate::redis::RedisPool;

use super::backend::SubscriptionStore;
use super::memory_backend::MemorySubscriptionStore;
use super::postgres_backend::PostgresSubscriptionStore;
use super::redis_backend::RedisSubscriptionStore;

/// Create a subscription store based on configuration.
///
/// - `"postgres"`: `PostgresSubscriptionStore` if a PostgreSQL pool is provided
/// - `"redis"`: `RedisSubscriptionStore` if a Redis pool is provided
/// - `"memory"` (default): `MemorySubscriptionStore`
///
/// A durable backend requested without its pool falls back to memory.
pub fn create_subscription_store(
    settings: &RegistryConfig,
    redis_pool: Option<Arc<RedisPool>>,
    postgres_pool: Option<Arc<PostgresPool>>,
) -> Arc<dyn SubscriptionStore> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = postgres_pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL subscription store");
                Arc::new(PostgresSubscriptionStore::new(pool.pool().clone()))
            } else {
                tracing::warn!(
                    "PostgreSQL registry requested but no pool provided, falling back to memory"
                );
                Arc::new(MemorySubscriptionStore::new())
            }
        }
        "redis" => {
            if let Some(pool) = redis_pool {
                tracing::info!(
                    backend = "redis",
                    prefix = %settings.redis_prefix,
                    "Creating Redis subscription store"
                );
                Arc::new(RedisSubscriptionStore::new(pool, settings.redis_prefix.clone()))
            } else {
                tracing::warn!("Redis registry requested but no pool provided, falling back to memory");
                Arc::new(MemorySubscriptionStore::new())
            }
        }
        other => {
            if other != "memory" {
                tracing::warn!(backend = %other, "Unknown registry backend, using memory");
            }
            tracing::info!(
                backend = "memory",
                "Creating memory subscription store (subscriptions are lost on restart)"
            );
            Arc::new(MemorySubscriptionStore::new())
        }
    }
}
