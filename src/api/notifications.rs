//! Manual notification endpoint.

use axum::{extract::State, Json};

use crate::error::Result;
use crate::notification::{DispatchOutcome, NotificationRequest};
use crate::server::AppState;

use super::ApiJson;

/// POST /notifications - send to every subscription or to `target`
#[tracing::instrument(
    name = "http.send_notification",
    skip(state, request),
    fields(target_kind = request.target_selector().as_label())
)]
pub async fn send_notification(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NotificationRequest>,
) -> Result<Json<DispatchOutcome>> {
    let target = request.target_selector();
    let outcome = state.dispatcher.dispatch(&request, &target).await?;
    Ok(Json(outcome))
}
