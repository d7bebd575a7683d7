//! HTTP API integration tests
//!
//! Drive the full router with an in-memory registry and a scripted
//! transport, without binding a socket or reaching any push service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use push_relay_service::config::{SaasConfig, Settings};
use push_relay_service::notification::NotificationRequest;
use push_relay_service::registry::{MemorySubscriptionStore, SubscriptionRecord, SubscriptionStore};
use push_relay_service::server::{create_app, AppState, API_KEY_HEADER};
use push_relay_service::transport::{DeliveryReport, PushTransport, SaasTransport};

/// Endpoints containing "gone" answer 410, "flaky" 503, everything else 201
#[derive(Default)]
struct ScriptedTransport {
    sent: Mutex<Vec<(String, NotificationRequest)>>,
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(&self, record: &SubscriptionRecord, request: &NotificationRequest) -> DeliveryReport {
        let key = record.key().to_string();
        self.sent.lock().unwrap().push((key.clone(), request.clone()));
        if key.contains("gone") {
            DeliveryReport::permanent(Some(410), "subscription gone")
        } else if key.contains("flaky") {
            DeliveryReport::transient(Some(503), "HTTP 503")
        } else {
            DeliveryReport::delivered(201)
        }
    }

    fn public_key(&self) -> Option<&str> {
        Some("BTestPublicKey")
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemorySubscriptionStore>,
    transport: Arc<ScriptedTransport>,
}

fn test_app_with(settings: Settings) -> TestApp {
    let store = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(ScriptedTransport::default());
    let state = AppState::with_components(settings, store.clone(), transport.clone());
    TestApp {
        router: create_app(state),
        store,
        transport,
    }
}

fn test_app() -> TestApp {
    test_app_with(Settings::default())
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_with_key(router, method, uri, body, None).await
}

async fn call_with_key(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn browser_subscription(endpoint: &str) -> Value {
    json!({
        "subscription": {
            "endpoint": endpoint,
            "expirationTime": null,
            "keys": { "p256dh": "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM", "auth": "tBHItJI5svbpez7KI4CCXg" }
        }
    })
}

#[tokio::test]
async fn test_save_subscription_upserts() {
    let app = test_app();

    let (status, body) = call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "totalSubscriptions": 1}));

    // Same endpoint again replaces rather than duplicates
    let (_, body) = call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    assert_eq!(body["totalSubscriptions"], 1);

    let (_, body) = call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/b"))).await;
    assert_eq!(body["totalSubscriptions"], 2);
}

#[tokio::test]
async fn test_save_subscription_without_key_is_rejected() {
    let app = test_app();

    let (status, body) = call(&app.router, "POST", "/subscriptions", Some(json!({"subscription": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = call(&app.router, "POST", "/subscriptions", Some(json!({"nope": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_save_rejects_record_transport_cannot_reach() {
    let transport = SaasTransport::new(&SaasConfig {
        app_id: Some("app-123".to_string()),
        api_key: Some("secret-key".to_string()),
        api_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 1,
    })
    .unwrap();
    let store = Arc::new(MemorySubscriptionStore::new());
    let router = create_app(AppState::with_components(Settings::default(), store.clone(), Arc::new(transport)));

    let (status, body) = call(&router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "saas delivery requires a subscriberId");
    assert_eq!(store.count().await.unwrap(), 0);

    let (status, body) = call(&router, "POST", "/subscriptions", Some(json!({"subscription": {"subscriberId": "player-1"}}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSubscriptions"], 1);
}

#[tokio::test]
async fn test_list_is_redacted() {
    let app = test_app();
    let long_endpoint = format!("https://fcm.googleapis.com/fcm/send/{}", "x".repeat(120));
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription(&long_endpoint))).await;
    call(&app.router, "POST", "/subscriptions", Some(json!({"subscription": {"subscriberId": "player-1"}}))).await;

    let (status, body) = call(&app.router, "GET", "/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let first = &body["subscriptions"][0];
    assert!(first["key"].as_str().unwrap().ends_with("..."));
    assert_eq!(first["kind"], "webpush");
    assert_eq!(first["hasKeys"], true);
    assert!(first.get("keys").is_none());

    assert_eq!(body["subscriptions"][1]["kind"], "saas");
}

#[tokio::test]
async fn test_clear_subscriptions() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/b"))).await;

    let (status, body) = call(&app.router, "DELETE", "/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "clearedCount": 2}));
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_remove_subscription_is_idempotent() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let uri = "/subscriptions/https%3A%2F%2Fpush.example%2Fa";
    let (status, body) = call(&app.router, "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "removed": true, "totalSubscriptions": 0}));

    let (status, body) = call(&app.router, "DELETE", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], false);
}

#[tokio::test]
async fn test_broadcast_purges_gone_subscription() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/gone-b"))).await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/notifications",
        Some(json!({"title": "Hello", "body": "World", "tag": "greeting"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], json!({"total": 2, "successful": 1, "failed": 1, "removed": 1}));
    assert_eq!(body["results"][0]["target"], "https://push.example/a");
    assert_eq!(body["results"][0]["statusCode"], 201);
    assert_eq!(body["results"][1]["statusCode"], 410);
    assert_eq!(body["results"][1]["permanent"], true);
    assert!(body["notificationId"].is_string());

    let remaining = app.store.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].key(), "https://push.example/a");
}

#[tokio::test]
async fn test_transient_failure_is_counted_not_purged() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/flaky"))).await;

    let (status, body) = call(&app.router, "POST", "/notifications", Some(json!({"title": "t", "body": "b"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(body["summary"]["removed"], 0);
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_send_to_single_target() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/b"))).await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/notifications",
        Some(json!({"title": "t", "body": "b", "target": "https://push.example/b"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total"], 1);
    let sent = app.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "https://push.example/b");
}

#[tokio::test]
async fn test_send_to_unknown_target_is_noop() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/notifications",
        Some(json!({"title": "t", "body": "b", "target": "https://push.example/missing"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["targetNotFound"], true);
    assert_eq!(body["summary"], json!({"total": 0, "successful": 0, "failed": 0, "removed": 0}));
    assert!(app.transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_with_no_subscribers() {
    let app = test_app();

    let (status, body) = call(&app.router, "POST", "/notifications", Some(json!({"title": "t", "body": "b"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_SUBSCRIBERS");
}

#[tokio::test]
async fn test_send_requires_title_and_body() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let (status, body) = call(&app.router, "POST", "/notifications", Some(json!({"title": "", "body": "b"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "title is required");
    assert!(app.transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_trading_signal_threshold() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let signal = |confidence: u32| {
        json!({
            "symbol": "BTCUSDT",
            "action": "BUY",
            "price": 42000,
            "confidence": confidence,
            "stopLoss": 41000,
            "takeProfit": 45000
        })
    };

    let (status, body) = call(&app.router, "POST", "/trading-signal", Some(signal(74))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notified"], false);
    assert!(body["reason"].as_str().unwrap().contains("below threshold"));
    assert!(app.transport.sent.lock().unwrap().is_empty());

    let (status, body) = call(&app.router, "POST", "/trading-signal", Some(signal(75))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notified"], true);
    assert_eq!(body["dispatch"]["summary"]["successful"], 1);

    let sent = app.transport.sent.lock().unwrap();
    assert_eq!(sent[0].1.tag.as_deref(), Some("trading-signal-BTCUSDT"));
}

#[tokio::test]
async fn test_price_alert_crossing() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let (_, body) = call(
        &app.router,
        "POST",
        "/price-alert",
        Some(json!({"symbol": "ETH", "currentPrice": 99, "targetPrice": 100, "alertType": "above"})),
    )
    .await;
    assert_eq!(body["notified"], false);

    let (_, body) = call(
        &app.router,
        "POST",
        "/price-alert",
        Some(json!({"symbol": "ETH", "currentPrice": 100, "targetPrice": 100, "alertType": "above"})),
    )
    .await;
    assert_eq!(body["notified"], true);
}

#[tokio::test]
async fn test_market_event_severity() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let event = |severity: &str| {
        json!({
            "eventType": "halt",
            "title": "Trading halted",
            "description": "Maintenance window",
            "severity": severity
        })
    };

    let (_, body) = call(&app.router, "POST", "/market-event", Some(event("low"))).await;
    assert_eq!(body["notified"], false);

    let (_, body) = call(&app.router, "POST", "/market-event", Some(event("critical"))).await;
    assert_eq!(body["notified"], true);

    let sent = app.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.title.starts_with("🚨"));
    assert!(sent[0].1.require_interaction);
}

#[tokio::test]
async fn test_rule_passing_without_subscribers_is_error() {
    let app = test_app();

    let (status, body) = call(
        &app.router,
        "POST",
        "/market-event",
        Some(json!({"eventType": "halt", "title": "t", "description": "d", "severity": "high"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_SUBSCRIBERS");
}

#[tokio::test]
async fn test_invalid_rule_input() {
    let app = test_app();

    let (status, body) = call(
        &app.router,
        "POST",
        "/trading-signal",
        Some(json!({"symbol": "BTC", "action": "BUY", "price": -1, "confidence": 90})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "price must be a positive number");
}

#[tokio::test]
async fn test_api_key_protects_admin_routes() {
    let mut settings = Settings::default();
    settings.api.key = Some("admin-secret".to_string());
    let app = test_app_with(settings);

    // Browser-facing routes stay open
    let (status, _) = call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app.router, "GET", "/subscriptions", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call_with_key(&app.router, "GET", "/subscriptions", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call_with_key(&app.router, "GET", "/subscriptions", None, Some("admin-secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = call(&app.router, "DELETE", "/subscriptions", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_vapid_public_key() {
    let app = test_app();
    let (status, body) = call(&app.router, "GET", "/vapid-public-key", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"publicKey": "BTestPublicKey"}));
}

#[tokio::test]
async fn test_health_and_stats() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;
    call(&app.router, "POST", "/notifications", Some(json!({"title": "t", "body": "b"}))).await;

    let (status, body) = call(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["registry"]["backend"], "memory");
    assert_eq!(body["registry"]["subscriptions"], 1);
    assert_eq!(body["transport"]["name"], "scripted");

    let (status, body) = call(&app.router, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatcher"]["totalDispatches"], 1);
    assert_eq!(body["dispatcher"]["totalDelivered"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app();
    call(&app.router, "POST", "/subscriptions", Some(browser_subscription("https://push.example/a"))).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("push_relay_registry_subscriptions"));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut settings = Settings::default();
    settings.api.max_body_bytes = 256;
    let app = test_app_with(settings);

    let big = json!({"title": "t", "body": "x".repeat(1024)});
    let (status, _) = call(&app.router, "POST", "/notifications", Some(big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
