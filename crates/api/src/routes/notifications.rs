//! Notification trigger used by the webmail backend.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use mailwatch_common::types::NotificationEvent;

use crate::middleware::auth::ServiceKey;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/notifications", post(trigger_notification))
}

/// POST /api/notifications: Queue a lifecycle event for Telegram delivery.
///
/// Responds as soon as the event is accepted; delivery happens in the
/// background and its outcome is only logged.
async fn trigger_notification(
    State(state): State<AppState>,
    _key: ServiceKey,
    Json(event): Json<NotificationEvent>,
) -> StatusCode {
    tracing::info!(event = event.kind(), "Notification accepted");

    state
        .notifier
        .spawn_notify(state.config.notification_settings(), event);

    StatusCode::ACCEPTED
}
