//! Prometheus metrics for the push relay service.
//!
//! - Dispatch metrics (dispatches by target kind, deliveries, failures)
//! - Registry metrics (size, permanent removals, expired prunes)
//! - Transport latency
//! - Conditional rule evaluations

mod helpers;

pub use helpers::{encode_metrics, DispatchMetrics, RegistryMetrics, RuleMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "push_relay";

lazy_static! {
    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Total dispatch calls by target kind
    pub static ref DISPATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatches_total", METRIC_PREFIX),
        "Total dispatch calls",
        &["target"]
    ).unwrap();

    /// Dispatch calls rejected because no subscriber matched
    pub static ref DISPATCHES_NO_TARGETS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatches_no_targets_total", METRIC_PREFIX),
        "Dispatch calls rejected because the target set was empty"
    ).unwrap();

    /// Per-target delivery attempts, labelled delivered, gone or failed
    pub static ref DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_deliveries_total", METRIC_PREFIX),
        "Per-target delivery attempts by transport and outcome",
        &["transport", "outcome"]
    ).unwrap();

    /// Per-target send latency
    pub static ref SEND_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_send_latency_seconds", METRIC_PREFIX),
        "Latency of a single push send in seconds",
        &["transport"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Registry Metrics
    // ============================================================================

    /// Current number of stored subscriptions
    pub static ref REGISTRY_SUBSCRIPTIONS: IntGauge = register_int_gauge!(
        format!("{}_registry_subscriptions", METRIC_PREFIX),
        "Number of subscriptions in the registry"
    ).unwrap();

    /// Subscriptions removed because the push service reported them gone
    pub static ref REGISTRY_PURGED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_registry_purged_total", METRIC_PREFIX),
        "Subscriptions removed after a permanent delivery failure"
    ).unwrap();

    /// Subscriptions pruned because their expiration time passed
    pub static ref REGISTRY_EXPIRED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_registry_expired_total", METRIC_PREFIX),
        "Subscriptions pruned after expiring"
    ).unwrap();

    /// Registry backend errors by operation
    pub static ref REGISTRY_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_registry_errors_total", METRIC_PREFIX),
        "Registry backend errors",
        &["operation"]
    ).unwrap();

    // ============================================================================
    // Rule Metrics
    // ============================================================================

    /// Conditional rule evaluations by rule and outcome
    pub static ref RULE_EVALUATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_rule_evaluations_total", METRIC_PREFIX),
        "Conditional rule evaluations",
        &["rule", "outcome"]
    ).unwrap();
}
