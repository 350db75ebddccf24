//! API route modules
//!
//! # Structure
//!
//! - [`orders`] - order intake, querying and updates
//! - [`analytics`] - dashboard rollups
//! - [`notifications`] - recent-notification replay
//! - [`events`] - live event WebSocket
//! - [`health`] - liveness probe

pub mod analytics;
pub mod events;
pub mod health;
pub mod notifications;
pub mod orders;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::{BoxError, Router};
use http::Method;
use http::header;
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::utils::AppError;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// Per-request processing deadline
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// In-flight request cap across all connections
const MAX_IN_FLIGHT_REQUESTS: usize = 512;

/// Assemble the application router with middleware applied
pub fn build_router(state: ServerState) -> Router {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(analytics::router())
        .merge(notifications::router())
        .merge(events::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
                .layer(ConcurrencyLimitLayer::new(MAX_IN_FLIGHT_REQUESTS)),
        )
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// CORS for browser POS terminals; `PATCH` is not on the CORS safelist
/// and must be allowed explicitly
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Map middleware failures into the response envelope
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::task::{Context, Poll};

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use tower::Service;
    use tower::timeout::Timeout;

    use super::*;

    /// Always-ready service whose response never arrives
    struct Hang;

    impl Service<()> for Hang {
        type Response = ();
        type Error = Infallible;
        type Future = std::future::Pending<Result<(), Infallible>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _: ()) -> Self::Future {
            std::future::pending()
        }
    }

    #[tokio::test]
    async fn elapsed_deadline_maps_to_request_timeout() {
        let mut service = Timeout::new(Hang, Duration::from_millis(5));
        let err = service.call(()).await.unwrap_err();

        let response = handle_middleware_error(err).await.into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn other_middleware_errors_stay_internal() {
        let err: BoxError = "queue snapped".into();
        let response = handle_middleware_error(err).await.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
