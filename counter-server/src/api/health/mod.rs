//! Health check route
//!
//! # Routes
//!
//! | path | method | auth |
//! |------|--------|------|
//! | /api/health | GET | none |

use std::time::SystemTime;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// Health router - public, no auth
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

/// Liveness probe response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Status (ok)
    status: &'static str,
    name: &'static str,
    version: &'static str,
    /// Uptime in seconds
    uptime_seconds: u64,
    /// Stored orders
    orders: usize,
    /// Live event connections
    connections: usize,
    /// Frames dropped to stalled consumers since startup
    dropped_frames: u64,
    /// Advisory submission timeout clients should apply, milliseconds
    submit_timeout_ms: u64,
}

// Server start time (lazy static)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// GET /api/health
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime_seconds(),
        orders: state.store.len(),
        connections: state.hub.connection_count(),
        dropped_frames: state.hub.dropped_frames(),
        submit_timeout_ms: state.config.submit_timeout_ms,
    })
}
