//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DELIVERIES_TOTAL, DISPATCHES_NO_TARGETS_TOTAL, DISPATCHES_TOTAL, REGISTRY_ERRORS_TOTAL,
    REGISTRY_EXPIRED_TOTAL, REGISTRY_PURGED_TOTAL, REGISTRY_SUBSCRIPTIONS,
    RULE_EVALUATIONS_TOTAL, SEND_LATENCY,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a dispatch to every registered subscription
    pub fn record_broadcast() {
        DISPATCHES_TOTAL.with_label_values(&["all"]).inc();
    }

    /// Record a dispatch to one subscription
    pub fn record_single() {
        DISPATCHES_TOTAL.with_label_values(&["single"]).inc();
    }

    /// Record a dispatch that found nobody to send to
    pub fn record_no_targets() {
        DISPATCHES_NO_TARGETS_TOTAL.inc();
    }

    /// Record a per-target outcome and its latency
    pub fn record_send(transport: &str, success: bool, permanent: bool, seconds: f64) {
        let outcome = match (success, permanent) {
            (true, _) => "delivered",
            (false, true) => "gone",
            (false, false) => "failed",
        };
        DELIVERIES_TOTAL.with_label_values(&[transport, outcome]).inc();
        SEND_LATENCY.with_label_values(&[transport]).observe(seconds);
    }
}

/// Helper struct for registry metrics
pub struct RegistryMetrics;

impl RegistryMetrics {
    pub fn set_size(count: usize) {
        REGISTRY_SUBSCRIPTIONS.set(count as i64);
    }

    pub fn record_purged() {
        REGISTRY_PURGED_TOTAL.inc();
    }

    pub fn record_expired(count: usize) {
        REGISTRY_EXPIRED_TOTAL.inc_by(count as u64);
    }

    pub fn record_error(operation: &str) {
        REGISTRY_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

/// Helper struct for conditional rule metrics
pub struct RuleMetrics;

impl RuleMetrics {
    pub fn record(rule: &str, notified: bool) {
        let outcome = if notified { "notified" } else { "suppressed" };
        RULE_EVALUATIONS_TOTAL.with_label_values(&[rule, outcome]).inc();
    }
}
