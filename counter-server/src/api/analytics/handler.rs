//! Analytics API Handlers

use axum::Json;
use axum::extract::State;
use chrono::Local;

use crate::core::ServerState;
use crate::stats::AnalyticsReport;
use crate::utils::{AppResponse, ok};

/// GET /api/analytics
///
/// Recomputed from a store snapshot on every call, no cache.
pub async fn get_analytics(State(state): State<ServerState>) -> Json<AppResponse<AnalyticsReport>> {
    let snapshot = state.store.snapshot();
    let report = AnalyticsReport::compute(&snapshot, Local::now());
    tracing::debug!(orders = snapshot.len(), "Computed analytics rollup");
    ok(report)
}
