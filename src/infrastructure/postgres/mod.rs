//! PostgreSQL persistence module.
//!
//! Provides connection pooling and schema bootstrap for the PostgreSQL
//! registry backend.

pub mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
