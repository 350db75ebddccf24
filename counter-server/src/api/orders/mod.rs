//! Orders API
//!
//! # Routes
//!
//! | path | method | description |
//! |------|--------|-------------|
//! | /api/orders | POST | submit a client-priced order (idempotent by id) |
//! | /api/orders | GET | filtered, paginated listing |
//! | /api/orders/{id} | GET | single order |
//! | /api/orders/{id} | PATCH | merge-patch of mutable fields |

pub mod handler;

use axum::Router;
use axum::routing::get;

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", axum::routing::post(handler::create).get(handler::list))
        .route("/{id}", get(handler::get_by_id).patch(handler::update))
}
