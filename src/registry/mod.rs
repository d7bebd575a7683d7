//! Subscription registry.
//!
//! # Backend Architecture
//!
//! - `MemorySubscriptionStore`: single-mutex in-memory map (default, not durable)
//! - `RedisSubscriptionStore`: Redis hash + sorted set
//! - `PostgresSubscriptionStore`: `push_subscriptions` table
//!
//! Use `create_subscription_store()` to pick one from configuration.

mod backend;
mod factory;
mod memory_backend;
mod postgres_backend;
mod redis_backend;
mod types;

pub use backend::{RegistryError, SubscriptionStore};
pub use factory::create_subscription_store;
pub use memory_backend::MemorySubscriptionStore;
pub use postgres_backend::PostgresSubscriptionStore;
pub use redis_backend::RedisSubscriptionStore;
pub use types::{
    truncate_key, RedactedSubscription, SubscriptionKeys, SubscriptionKind, SubscriptionRecord,
    DISPLAY_KEY_CHARS,
};
