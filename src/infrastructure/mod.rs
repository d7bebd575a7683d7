//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `config`: Application configuration and settings
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics and helpers
//! - `postgres`: PostgreSQL connection pool
//! - `redis`: Redis connection pool

pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod redis;
