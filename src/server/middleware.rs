use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::AppState;

/// Header carrying the admin API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication middleware
/// Validates X-API-Key header against configured api.key
pub async fn api_key_auth(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    // If no API key is configured, allow all requests (development mode)
    let Some(expected_key) = state.settings.api.key.as_deref().filter(|k| !k.is_empty()) else {
        return next.run(req).await;
    };

    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|key| key == expected_key);

    match api_key {
        Some(true) => next.run(req).await,
        Some(false) => {
            tracing::warn!(path = %req.uri().path(), "Invalid API key provided");
            unauthorized("Invalid API key")
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "Missing API key header");
            unauthorized("Missing X-API-Key header")
        }
    }
}

fn unauthorized(message: &str) -> Response {
    let body = json!({
        "error": {
            "code": "UNAUTHORIZED",
            "message": message
        }
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
