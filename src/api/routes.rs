use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::conditional::{market_event, price_alert, trading_signal};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::notifications::send_notification;
use super::subscriptions::{
    clear_subscriptions, list_subscriptions, remove_subscription, save_subscription,
    vapid_public_key,
};

/// All routes. Browser-facing endpoints are public; the rest require
/// the admin API key when one is configured.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/vapid-public-key", get(vapid_public_key))
        .route("/subscriptions", post(save_subscription))
        .route("/subscriptions/{key}", delete(remove_subscription));

    let protected = Router::new()
        // Registry administration
        .route("/subscriptions", get(list_subscriptions).delete(clear_subscriptions))
        // Manual send
        .route("/notifications", post(send_notification))
        // Conditional rules
        .route("/trading-signal", post(trading_signal))
        .route("/price-alert", post(price_alert))
        .route("/market-event", post(market_event))
        // Observability
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .route_layer(from_fn_with_state(state, api_key_auth));

    public.merge(protected)
}
