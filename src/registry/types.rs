use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of key characters shown in responses and logs
pub const DISPLAY_KEY_CHARS: usize = 50;

/// Encryption material of a raw Web Push subscription (browser `PushSubscription.keys`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Subscriber's P-256 public key, base64url
    pub p256dh: String,
    /// 16-byte authentication secret, base64url
    pub auth: String,
}

/// A registered push subscription.
///
/// Identity is the push endpoint for raw Web Push, or the vendor-issued
/// subscriber id for SaaS delivery. See [`SubscriptionRecord::key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<SubscriptionKeys>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Browser-reported expiry, epoch milliseconds on the wire
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Which delivery mechanism a record is addressable by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    WebPush,
    Saas,
}

/// Redacted view of a record for listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedSubscription {
    pub key: String,
    pub kind: SubscriptionKind,
    pub has_keys: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    /// Raw Web Push record
    pub fn web_push(endpoint: impl Into<String>, p256dh: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            keys: Some(SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            }),
            subscriber_id: None,
            created_at: Utc::now(),
            expiration_time: None,
        }
    }

    /// Push SaaS record addressed by vendor subscriber id
    pub fn saas(subscriber_id: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            keys: None,
            subscriber_id: Some(subscriber_id.into()),
            created_at: Utc::now(),
            expiration_time: None,
        }
    }

    /// Registry key: the endpoint when present, otherwise the subscriber id.
    /// Empty when neither is set.
    pub fn key(&self) -> &str {
        non_empty(self.endpoint.as_deref())
            .or_else(|| non_empty(self.subscriber_id.as_deref()))
            .unwrap_or("")
    }

    pub fn kind(&self) -> SubscriptionKind {
        if non_empty(self.endpoint.as_deref()).is_some() {
            SubscriptionKind::WebPush
        } else {
            SubscriptionKind::Saas
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|at| at <= now)
    }

    pub fn redacted(&self) -> RedactedSubscription {
        RedactedSubscription {
            key: truncate_key(self.key()),
            kind: self.kind(),
            has_keys: self.keys.is_some(),
            created_at: self.created_at,
            expiration_time: self.expiration_time,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Shorten a subscription key for display
pub fn truncate_key(key: &str) -> String {
    if key.chars().count() <= DISPLAY_KEY_CHARS {
        key.to_string()
    } else {
        let prefix: String = key.chars().take(DISPLAY_KEY_CHARS).collect();
        format!("{}...", prefix)
    }
}
