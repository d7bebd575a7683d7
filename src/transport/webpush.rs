//! Raw Web Push delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;

use crate::config::WebPushConfig;
use crate::notification::NotificationRequest;
use crate::registry::{truncate_key, SubscriptionRecord};

use super::ece::encrypt_payload;
use super::vapid::VapidSigner;
use super::{report_for_error, report_for_status, DeliveryReport, PushTransport, TransportError};

/// Payload the service worker receives after decryption
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushPayload<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Map<String, serde_json::Value>>,
    require_interaction: bool,
}

impl<'a> From<&'a NotificationRequest> for PushPayload<'a> {
    fn from(request: &'a NotificationRequest) -> Self {
        Self {
            title: &request.title,
            body: &request.body,
            icon: request.icon.as_deref(),
            badge: request.badge.as_deref(),
            tag: request.tag.as_deref(),
            url: request.url.as_deref(),
            data: request.data.as_ref(),
            require_interaction: request.require_interaction,
        }
    }
}

/// Delivers to browser push services with VAPID authorization
pub struct WebPushTransport {
    client: reqwest::Client,
    signer: VapidSigner,
    default_ttl: u32,
}

impl WebPushTransport {
    pub fn new(config: &WebPushConfig) -> Result<Self, TransportError> {
        let private_key = config
            .vapid_private_key_pem
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TransportError::Config("webpush.vapid_private_key_pem is not set".into()))?;
        let public_key = config
            .vapid_public_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TransportError::Config("webpush.vapid_public_key is not set".into()))?;

        let signer = VapidSigner::new(private_key, public_key, config.subject.clone())?;
        Self::with_signer(signer, config.ttl_seconds, Duration::from_secs(config.timeout_seconds))
    }

    pub fn with_signer(
        signer: VapidSigner,
        default_ttl: u32,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            signer,
            default_ttl,
        })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    fn name(&self) -> &'static str {
        "webpush"
    }

    #[tracing::instrument(
        name = "webpush.send",
        skip_all,
        fields(subscription = %truncate_key(record.key()))
    )]
    async fn send(&self, record: &SubscriptionRecord, request: &NotificationRequest) -> DeliveryReport {
        let (Some(endpoint), Some(keys)) = (record.endpoint.as_deref(), record.keys.as_ref()) else {
            return DeliveryReport::transient(None, "subscription has no endpoint or encryption keys");
        };

        let payload = match serde_json::to_vec(&PushPayload::from(request)) {
            Ok(payload) => payload,
            Err(e) => return DeliveryReport::transient(None, format!("payload serialization failed: {}", e)),
        };

        let body = match encrypt_payload(&keys.p256dh, &keys.auth, &payload) {
            Ok(body) => body,
            Err(e) => return DeliveryReport::transient(None, e.to_string()),
        };

        let authorization = match self.signer.authorization(endpoint) {
            Ok(value) => value,
            Err(e) => return DeliveryReport::transient(None, e.to_string()),
        };

        let urgency = if request.require_interaction { "high" } else { "normal" };
        let ttl = request.ttl.unwrap_or(self.default_ttl);

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("TTL", ttl.to_string())
            .header("Urgency", urgency)
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let detail = if response.status().is_success() {
                    String::new()
                } else {
                    response.text().await.unwrap_or_default()
                };
                let report = report_for_status(status, &detail);
                tracing::debug!(status = status, success = report.success, "Push service responded");
                report
            }
            Err(e) => {
                tracing::debug!(error = %e, "Push request failed");
                report_for_error(&e)
            }
        }
    }

    fn check_record(&self, record: &SubscriptionRecord) -> Result<(), String> {
        let has_endpoint = record.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty());
        if has_endpoint && record.keys.is_some() {
            Ok(())
        } else {
            Err("webpush delivery requires a subscription endpoint and keys".to_string())
        }
    }

    fn public_key(&self) -> Option<&str> {
        Some(self.signer.public_key())
    }
}
