//! Conditional notification endpoints.
//!
//! A suppressed rule is a normal outcome (200, `notified: false`).
//! A rule that fires with nobody subscribed is the NO_SUBSCRIBERS error.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::metrics::RuleMetrics;
use crate::notification::DispatchOutcome;
use crate::rules::{
    evaluate_market_event, evaluate_price_alert, evaluate_trading_signal, MarketEvent, PriceAlert,
    RuleOutcome, TradingSignal,
};
use crate::server::AppState;

use super::ApiJson;

#[derive(Debug, Serialize)]
pub struct ConditionalResponse {
    pub notified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchOutcome>,
}

async fn apply(state: &AppState, rule: &'static str, outcome: RuleOutcome) -> Result<Json<ConditionalResponse>> {
    RuleMetrics::record(rule, outcome.is_notify());

    match outcome {
        RuleOutcome::Suppressed { reason } => {
            tracing::debug!(rule = rule, reason = %reason, "Rule suppressed notification");
            Ok(Json(ConditionalResponse {
                notified: false,
                reason: Some(reason),
                dispatch: None,
            }))
        }
        RuleOutcome::Notify(request) => {
            let target = request.target_selector();
            let dispatch = state.dispatcher.dispatch(&request, &target).await?;
            Ok(Json(ConditionalResponse {
                notified: true,
                reason: None,
                dispatch: Some(dispatch),
            }))
        }
    }
}

/// POST /trading-signal
#[tracing::instrument(
    name = "http.trading_signal",
    skip(state, signal),
    fields(symbol = %signal.symbol, confidence = signal.confidence)
)]
pub async fn trading_signal(
    State(state): State<AppState>,
    ApiJson(signal): ApiJson<TradingSignal>,
) -> Result<Json<ConditionalResponse>> {
    signal.validate().map_err(AppError::Validation)?;
    let threshold = state.settings.rules.trading_confidence_threshold;
    apply(&state, "trading_signal", evaluate_trading_signal(&signal, threshold)).await
}

/// POST /price-alert
#[tracing::instrument(
    name = "http.price_alert",
    skip(state, alert),
    fields(symbol = %alert.symbol)
)]
pub async fn price_alert(
    State(state): State<AppState>,
    ApiJson(alert): ApiJson<PriceAlert>,
) -> Result<Json<ConditionalResponse>> {
    alert.validate().map_err(AppError::Validation)?;
    apply(&state, "price_alert", evaluate_price_alert(&alert)).await
}

/// POST /market-event
#[tracing::instrument(
    name = "http.market_event",
    skip(state, event),
    fields(event_type = %event.event_type, severity = %event.severity)
)]
pub async fn market_event(
    State(state): State<AppState>,
    ApiJson(event): ApiJson<MarketEvent>,
) -> Result<Json<ConditionalResponse>> {
    event.validate().map_err(AppError::Validation)?;
    apply(&state, "market_event", evaluate_market_event(&event)).await
}
