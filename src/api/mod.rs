//! API layer - HTTP endpoint handlers organized by domain.

mod conditional;
mod health;
mod metrics;
mod notifications;
mod routes;
mod subscriptions;

use axum::extract::FromRequest;

use crate::error::AppError;

// Re-export all handlers for use in server/app.rs
pub use conditional::{market_event, price_alert, trading_signal, ConditionalResponse};
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use notifications::send_notification;
pub use routes::api_routes;
pub use subscriptions::{
    clear_subscriptions, list_subscriptions, remove_subscription, save_subscription,
    vapid_public_key,
};

/// JSON body extractor whose rejections use the standard error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
