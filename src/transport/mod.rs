//! Push delivery transports.
//!
//! One transport is pinned per deployment:
//!
//! - `WebPushTransport`: raw Web Push (RFC 8291 payload encryption + VAPID)
//! - `SaasTransport`: push SaaS REST API addressed by subscriber id
//!
//! Use `create_transport()` to build the configured one.

mod ece;
mod factory;
mod saas;
mod vapid;
mod webpush;

use async_trait::async_trait;
use thiserror::Error;

use crate::notification::NotificationRequest;
use crate::registry::SubscriptionRecord;

pub use ece::{encrypt_payload, EceError, MAX_PLAINTEXT_LEN, RECORD_SIZE};
pub use factory::create_transport;
pub use saas::SaasTransport;
pub use vapid::{audience_for, VapidSigner};
pub use webpush::WebPushTransport;

/// Transport construction errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport configuration error: {0}")]
    Config(String),

    #[error("VAPID key error: {0}")]
    Vapid(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Normalized result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    /// Subscription is gone and should be purged
    pub permanent: bool,
}

impl DeliveryReport {
    pub fn delivered(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            error: None,
            permanent: false,
        }
    }

    pub fn transient(status_code: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            error: Some(error.into()),
            permanent: false,
        }
    }

    pub fn permanent(status_code: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            error: Some(error.into()),
            permanent: true,
        }
    }
}

/// A delivery mechanism for one subscription at a time.
///
/// Implementations never return errors: every outcome, including
/// misconfigured records and network failures, becomes a `DeliveryReport`.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Short label used in logs and metrics
    fn name(&self) -> &'static str;

    async fn send(&self, record: &SubscriptionRecord, request: &NotificationRequest) -> DeliveryReport;

    /// Reject records this transport can never deliver to, before they are stored
    fn check_record(&self, _record: &SubscriptionRecord) -> Result<(), String> {
        Ok(())
    }

    /// Public application server key, for transports that have one
    fn public_key(&self) -> Option<&str> {
        None
    }
}

/// Map a push service HTTP status to a report.
/// 404 and 410 mean the subscription no longer exists.
pub(crate) fn report_for_status(status: u16, body: &str) -> DeliveryReport {
    match status {
        200..=299 => DeliveryReport::delivered(status),
        404 | 410 => DeliveryReport::permanent(Some(status), format!("subscription gone (HTTP {})", status)),
        _ => {
            let detail = body.trim();
            if detail.is_empty() {
                DeliveryReport::transient(Some(status), format!("HTTP {}", status))
            } else {
                let detail: String = detail.chars().take(200).collect();
                DeliveryReport::transient(Some(status), format!("HTTP {}: {}", status, detail))
            }
        }
    }
}

/// Map a reqwest failure (timeout, connect, body) to a transient report
pub(crate) fn report_for_error(err: &reqwest::Error) -> DeliveryReport {
    if err.is_timeout() {
        DeliveryReport::transient(None, "request timed out")
    } else if err.is_connect() {
        DeliveryReport::transient(None, format!("connection failed: {}", err))
    } else {
        DeliveryReport::transient(err.status().map(|s| s.as_u16()), err.to_string())
    }
}
