//! Subscription registry endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::metrics::RegistryMetrics;
use crate::registry::{truncate_key, RedactedSubscription, SubscriptionRecord};
use crate::server::AppState;

use super::ApiJson;

#[derive(Debug, Deserialize)]
pub struct SaveSubscriptionRequest {
    pub subscription: SubscriptionRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSubscriptionResponse {
    pub success: bool,
    pub total_subscriptions: usize,
}

#[derive(Debug, Serialize)]
pub struct ListSubscriptionsResponse {
    pub count: usize,
    pub subscriptions: Vec<RedactedSubscription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearSubscriptionsResponse {
    pub success: bool,
    pub cleared_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSubscriptionResponse {
    pub success: bool,
    /// False when the key was not registered
    pub removed: bool,
    pub total_subscriptions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidPublicKeyResponse {
    pub public_key: String,
}

/// POST /subscriptions - register or replace a subscription the transport can deliver to
#[tracing::instrument(
    name = "http.save_subscription",
    skip(state, request),
    fields(subscription = %truncate_key(request.subscription.key()))
)]
pub async fn save_subscription(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaveSubscriptionRequest>,
) -> Result<Json<SaveSubscriptionResponse>> {
    state
        .transport
        .check_record(&request.subscription)
        .map_err(AppError::Validation)?;

    let total = state.store.upsert(request.subscription).await.inspect_err(|_| {
        RegistryMetrics::record_error("upsert");
    })?;
    RegistryMetrics::set_size(total);

    tracing::info!(total = total, "Subscription saved");

    Ok(Json(SaveSubscriptionResponse {
        success: true,
        total_subscriptions: total,
    }))
}

/// GET /subscriptions - redacted listing in registration order
pub async fn list_subscriptions(State(state): State<AppState>) -> Result<Json<ListSubscriptionsResponse>> {
    let records = state.store.list().await?;
    let subscriptions: Vec<RedactedSubscription> = records.iter().map(SubscriptionRecord::redacted).collect();

    Ok(Json(ListSubscriptionsResponse {
        count: subscriptions.len(),
        subscriptions,
    }))
}

/// DELETE /subscriptions - drop every registration
#[tracing::instrument(name = "http.clear_subscriptions", skip(state))]
pub async fn clear_subscriptions(State(state): State<AppState>) -> Result<Json<ClearSubscriptionsResponse>> {
    let cleared = state.store.clear().await.inspect_err(|_| {
        RegistryMetrics::record_error("clear");
    })?;
    RegistryMetrics::set_size(0);

    tracing::info!(cleared = cleared, "Subscription registry cleared");

    Ok(Json(ClearSubscriptionsResponse {
        success: true,
        cleared_count: cleared,
    }))
}

/// DELETE /subscriptions/{key} - unsubscribe; unknown keys succeed
#[tracing::instrument(
    name = "http.remove_subscription",
    skip(state, key),
    fields(subscription = %truncate_key(&key))
)]
pub async fn remove_subscription(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemoveSubscriptionResponse>> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::Validation("subscription key is required".to_string()));
    }

    let removed = state.store.remove(key).await.inspect_err(|_| {
        RegistryMetrics::record_error("remove");
    })?;
    let total = state.store.count().await?;
    RegistryMetrics::set_size(total);

    Ok(Json(RemoveSubscriptionResponse {
        success: true,
        removed,
        total_subscriptions: total,
    }))
}

/// GET /vapid-public-key - application server key for `pushManager.subscribe`
pub async fn vapid_public_key(State(state): State<AppState>) -> Result<Json<VapidPublicKeyResponse>> {
    let public_key = state
        .transport
        .public_key()
        .ok_or_else(|| AppError::NotFound("Web Push transport is not configured".to_string()))?;

    Ok(Json(VapidPublicKeyResponse {
        public_key: public_key.to_string(),
    }))
}
