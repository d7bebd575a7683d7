//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub registry: RegistryHealthResponse,
    pub transport: TransportHealthResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryHealthResponse {
    pub backend: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportHealthResponse {
    pub name: String,
    pub vapid_configured: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub registry: RegistryStats,
    pub dispatcher: DispatcherStatsSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub backend: String,
    pub subscriptions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state.start_time.elapsed().as_secs();

    let subscriptions = match state.store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Registry health check failed");
            None
        }
    };
    let redis_ok = state.redis_pool.as_ref().map_or(true, |pool| pool.is_healthy());
    let available = subscriptions.is_some() && redis_ok;

    let status = if available { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        registry: RegistryHealthResponse {
            backend: state.store.backend_type().to_string(),
            available,
            subscriptions,
        },
        transport: TransportHealthResponse {
            name: state.transport.name().to_string(),
            vapid_configured: state.transport.public_key().is_some(),
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> crate::error::Result<Json<StatsResponse>> {
    let subscriptions = state.store.count().await?;

    Ok(Json(StatsResponse {
        registry: RegistryStats {
            backend: state.store.backend_type().to_string(),
            subscriptions,
        },
        dispatcher: state.dispatcher.stats(),
    }))
}
