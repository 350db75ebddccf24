//! Analytics API

pub mod handler;

use axum::Router;
use axum::routing::get;

use crate::core::ServerState;

/// Analytics router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/analytics", get(handler::get_analytics))
}
