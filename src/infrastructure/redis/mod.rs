//! Redis connectivity for the durable registry backend.
//!
//! - `RedisPool`: lazily established multiplexed connection with reconnect on drop

pub mod pool;

pub use pool::{PoolError, RedisPool};
