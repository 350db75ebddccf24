//! Live events API
//!
//! Single WebSocket upgrade route; the session protocol lives in
//! [`crate::fanout::ws`].

use axum::Router;
use axum::routing::get;

use crate::core::ServerState;
use crate::fanout::ws::handle_events_ws;

/// Events router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events/ws", get(handle_events_ws))
}
