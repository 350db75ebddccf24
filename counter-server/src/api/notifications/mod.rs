//! Notifications API

use axum::{Json, Router, extract::State, routing::get};
use shared::models::Notification;

use crate::core::ServerState;
use crate::utils::{AppResponse, ok};

/// Notification router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/notifications/recent", get(recent))
}

/// GET /api/notifications/recent
///
/// The bounded recent-notification buffer, oldest first. Late dashboard
/// joiners poll this once, then follow the `notifications` topic live.
pub async fn recent(State(state): State<ServerState>) -> Json<AppResponse<Vec<Notification>>> {
    ok(state.hub.recent_notifications())
}
