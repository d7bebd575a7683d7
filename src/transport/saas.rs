//! Hosted push SaaS delivery (OneSignal-style REST API).
//!
//! One API call per subscriber so that every registry record gets an exact
//! result. The vendor owns the browser subscription; we only hold its id.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::SaasConfig;
use crate::notification::NotificationRequest;
use crate::registry::{truncate_key, SubscriptionRecord};

use super::{report_for_error, DeliveryReport, PushTransport, TransportError};

/// Response keys listing ids the vendor no longer recognizes
const INVALID_ID_FIELDS: [&str; 2] = ["invalid_player_ids", "invalid_subscription_ids"];

#[derive(Debug, Serialize)]
struct LocalizedText<'a> {
    en: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateNotification<'a> {
    app_id: &'a str,
    headings: LocalizedText<'a>,
    contents: LocalizedText<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chrome_web_icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chrome_web_badge: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_push_topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    include_subscription_ids: [&'a str; 1],
}

/// Delivers through a push SaaS vendor's REST API
pub struct SaasTransport {
    client: reqwest::Client,
    app_id: String,
    api_key: String,
    notifications_url: String,
}

impl SaasTransport {
    pub fn new(config: &SaasConfig) -> Result<Self, TransportError> {
        let app_id = required(config.app_id.as_deref(), "saas.app_id")?;
        let api_key = required(config.api_key.as_deref(), "saas.api_key")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            app_id,
            api_key,
            notifications_url: format!("{}/notifications", config.api_url.trim_end_matches('/')),
        })
    }

    fn body<'a>(&'a self, subscriber_id: &'a str, request: &'a NotificationRequest) -> CreateNotification<'a> {
        CreateNotification {
            app_id: &self.app_id,
            headings: LocalizedText { en: &request.title },
            contents: LocalizedText { en: &request.body },
            data: request.data.as_ref(),
            url: request.url.as_deref(),
            chrome_web_icon: request.icon.as_deref(),
            chrome_web_badge: request.badge.as_deref(),
            web_push_topic: request.tag.as_deref(),
            ttl: request.ttl,
            include_subscription_ids: [subscriber_id],
        }
    }
}

fn required(value: Option<&str>, name: &str) -> Result<String, TransportError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| TransportError::Config(format!("{} is not set", name)))
}

/// Interpret a vendor response for one subscriber
fn interpret_response(status: u16, body: &Value, subscriber_id: &str) -> DeliveryReport {
    let rejected = INVALID_ID_FIELDS.iter().any(|field| {
        body.pointer(&format!("/errors/{}", field))
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(subscriber_id)))
    });
    if rejected {
        return DeliveryReport::permanent(Some(status), "subscriber id rejected by push vendor");
    }

    if !(200..300).contains(&status) {
        return DeliveryReport::transient(Some(status), format!("HTTP {}: {}", status, error_text(body)));
    }

    match body.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => DeliveryReport::delivered(status),
        _ => DeliveryReport::transient(Some(status), format!("no notification id returned: {}", error_text(body))),
    }
}

fn error_text(body: &Value) -> String {
    match body.get("errors") {
        Some(Value::Array(errors)) => errors
            .iter()
            .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => "no error detail".to_string(),
    }
}

#[async_trait]
impl PushTransport for SaasTransport {
    fn name(&self) -> &'static str {
        "saas"
    }

    #[tracing::instrument(
        name = "saas.send",
        skip_all,
        fields(subscription = %truncate_key(record.key()))
    )]
    async fn send(&self, record: &SubscriptionRecord, request: &NotificationRequest) -> DeliveryReport {
        let Some(subscriber_id) = record.subscriber_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) else {
            return DeliveryReport::transient(None, "subscription has no subscriber id");
        };

        let response = self
            .client
            .post(&self.notifications_url)
            .bearer_auth(&self.api_key)
            .json(&self.body(subscriber_id, request))
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "Push vendor request failed");
                return report_for_error(&e);
            }
        };

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        let report = interpret_response(status, &body, subscriber_id);
        tracing::debug!(status = status, success = report.success, "Push vendor responded");
        report
    }

    fn check_record(&self, record: &SubscriptionRecord) -> Result<(), String> {
        if record.subscriber_id.as_deref().is_some_and(|id| !id.trim().is_empty()) {
            Ok(())
        } else {
            Err("saas delivery requires a subscriberId".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    /// Fake vendor: rejects "stale-player", fails "broken-player", stalls on
    /// "slow-player", accepts the rest
    async fn spawn_vendor() -> (String, Captured) {
        let captured: Captured = Arc::default();

        async fn create(
            State(captured): State<Captured>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            captured.lock().unwrap().push((headers, body.clone()));
            match body["include_subscription_ids"][0].as_str() {
                Some("stale-player") => (
                    StatusCode::OK,
                    Json(json!({"id": "", "errors": {"invalid_subscription_ids": ["stale-player"]}})),
                ),
                Some("broken-player") => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"errors": ["app_id not found"]})),
                ),
                Some("slow-player") => {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    (StatusCode::OK, Json(json!({"id": "notif-late", "recipients": 1})))
                }
                _ => (StatusCode::OK, Json(json!({"id": "notif-1", "recipients": 1}))),
            }
        }

        let app = Router::new()
            .route("/notifications", post(create))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/", addr), captured)
    }

    fn transport(api_url: String) -> SaasTransport {
        SaasTransport::new(&SaasConfig {
            app_id: Some("app-123".into()),
            api_key: Some("secret-key".into()),
            api_url,
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_addresses_subscriber_id() {
        let (base, captured) = spawn_vendor().await;
        let request = NotificationRequest::builder("Price alert", "BTC above 50000")
            .tag("price-alert-BTC")
            .url("https://app.example/btc")
            .build();

        let report = transport(base).send(&SubscriptionRecord::saas("player-1"), &request).await;
        assert!(report.success, "{:?}", report);

        let captured = captured.lock().unwrap();
        let (headers, body) = &captured[0];
        assert_eq!(headers["authorization"], "Bearer secret-key");
        assert_eq!(body["app_id"], "app-123");
        assert_eq!(body["headings"]["en"], "Price alert");
        assert_eq!(body["contents"]["en"], "BTC above 50000");
        assert_eq!(body["web_push_topic"], "price-alert-BTC");
        assert_eq!(body["include_subscription_ids"], json!(["player-1"]));
    }

    #[tokio::test]
    async fn test_invalid_id_is_permanent() {
        let (base, _) = spawn_vendor().await;
        let request = NotificationRequest::builder("t", "b").build();

        let report = transport(base).send(&SubscriptionRecord::saas("stale-player"), &request).await;
        assert!(!report.success);
        assert!(report.permanent);
    }

    #[tokio::test]
    async fn test_vendor_error_is_transient() {
        let (base, _) = spawn_vendor().await;
        let request = NotificationRequest::builder("t", "b").build();

        let report = transport(base).send(&SubscriptionRecord::saas("broken-player"), &request).await;
        assert!(!report.success);
        assert!(!report.permanent);
        assert_eq!(report.status_code, Some(400));
        assert_eq!(report.error.as_deref(), Some("HTTP 400: app_id not found"));
    }

    #[tokio::test]
    async fn test_record_without_subscriber_id_skips_network() {
        let (base, captured) = spawn_vendor().await;
        let record = SubscriptionRecord::web_push("https://push.example/a", "BPk", "auth");
        let request = NotificationRequest::builder("t", "b").build();

        let report = transport(base).send(&record, &request).await;
        assert!(!report.success);
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_id_is_trimmed() {
        let (base, captured) = spawn_vendor().await;
        let transport = transport(base);
        let request = NotificationRequest::builder("t", "b").build();

        let report = transport.send(&SubscriptionRecord::saas("  player-2 "), &request).await;
        assert!(report.success, "{:?}", report);
        assert_eq!(
            captured.lock().unwrap()[0].1["include_subscription_ids"],
            json!(["player-2"])
        );

        let report = transport.send(&SubscriptionRecord::saas(" stale-player\t"), &request).await;
        assert!(report.permanent);
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let (base, _) = spawn_vendor().await;
        let mut transport = transport(base);
        transport.client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let request = NotificationRequest::builder("t", "b").build();

        let report = transport.send(&SubscriptionRecord::saas("slow-player"), &request).await;
        assert!(!report.success);
        assert!(!report.permanent);
        assert!(report.status_code.is_none());
        assert_eq!(report.error.as_deref(), Some("request timed out"));
    }

    #[test]
    fn test_check_record_requires_subscriber_id() {
        let transport = transport("http://127.0.0.1:9".to_string());
        assert!(transport.check_record(&SubscriptionRecord::saas("player-1")).is_ok());
        assert!(transport.check_record(&SubscriptionRecord::saas("   ")).is_err());

        let browser = SubscriptionRecord::web_push("https://push.example/a", "BPk", "auth");
        assert!(transport.check_record(&browser).is_err());
    }

    #[test]
    fn test_missing_id_is_failure() {
        let report = interpret_response(200, &json!({"id": "", "errors": ["All included players are not subscribed"]}), "p");
        assert!(!report.success);
        assert!(!report.permanent);
    }

    #[test]
    fn test_new_requires_credentials() {
        let err = SaasTransport::new(&SaasConfig::default()).err().unwrap();
        assert!(matches!(err, TransportError::Config(_)));
    }
}
