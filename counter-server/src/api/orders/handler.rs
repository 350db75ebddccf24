//! Order API Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderPatch, OrderStatus, Source};

use crate::core::ServerState;
use crate::store::{CreateOutcome, OrderFilter, Pagination};
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub source: Option<Source>,
    /// Case-insensitive substring match on the customer name
    pub customer: Option<String>,
    pub barista_id: Option<String>,
    /// Inclusive creation-time lower bound, epoch millis
    pub start_date: Option<i64>,
    /// Inclusive creation-time upper bound, epoch millis
    pub end_date: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Listing response with its pagination envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersResponse {
    pub orders: Vec<Order>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    /// Matching records before pagination
    pub total: usize,
    pub has_more: bool,
}

/// POST /api/orders
///
/// `201` for a new order, `200` when the same id arrives again with an
/// identical payload (the stored record is returned, nothing is created).
pub async fn create(
    State(state): State<ServerState>,
    Json(order): Json<Order>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.create_order(order)?;
    let (status, message) = if outcome.is_duplicate() {
        (StatusCode::OK, "Duplicate submission, returning stored order")
    } else {
        (StatusCode::CREATED, "Order created")
    };
    let order = match outcome {
        CreateOutcome::Created(order) | CreateOutcome::Duplicate(order) => order,
    };
    Ok((status, ok_with_message(order, message)))
}

/// GET /api/orders
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<ListOrdersResponse>>> {
    let filter = OrderFilter {
        status: query.status,
        source: query.source,
        customer: query.customer,
        barista_id: query.barista_id,
        from: query.start_date,
        to: query.end_date,
    };
    let page = state
        .store
        .list(&filter, Pagination::normalize(query.limit, query.offset));
    Ok(ok(ListOrdersResponse {
        orders: page.orders,
        pagination: PaginationInfo {
            total: page.total,
            has_more: page.has_more,
        },
    }))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.store.get(&id)?;
    Ok(ok(order))
}

/// PATCH /api/orders/{id}
///
/// Status changes go through the transition rules; everything else is a
/// plain merge. Either way the accepted update is fanned out.
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.update_order(&id, &patch)?;
    Ok(ok(order))
}
