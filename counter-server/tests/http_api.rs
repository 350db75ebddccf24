//! HTTP surface tests
//!
//! Calls the assembled router in process, through the full middleware
//! stack, the same way a deployed instance receives requests.

use std::collections::BTreeSet;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use counter_server::api::build_router;
use counter_server::{Config, ServerState};
use serde_json::Value;
use shared::models::{
    DrinkSize, Order, OrderItem, OrderStatus, OrderType, PaymentStatus, Priority, Source,
};
use shared::util::now_millis;
use tower::Service;

fn app() -> Router {
    let config = Config::with_overrides(0, "http-surface-secret-0123456789abcdef");
    build_router(ServerState::initialize(&config))
}

/// One latte to go: 4.50 subtotal, 0.36 tax, 4.86 total
fn takeaway(id: &str) -> Order {
    Order {
        id: id.to_string(),
        items: vec![OrderItem {
            drink_id: "drink-latte".to_string(),
            name: "Latte".to_string(),
            size: DrinkSize::Medium,
            unit_price: 4.50,
            quantity: 1,
            customizations: BTreeSet::new(),
            special_instructions: None,
            allergen_warnings: BTreeSet::new(),
        }],
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        order_type: OrderType::Takeaway,
        table_number: None,
        priority: Priority::Normal,
        source: Source::Pos,
        subtotal: 4.50,
        tax: 0.36,
        discount: 0.0,
        tip: 0.0,
        total: 4.86,
        timestamp: now_millis(),
        updated_at: None,
        customer: None,
        barista_id: None,
        estimated_time: Some(3),
        feedback: None,
        location_id: None,
    }
}

fn json_request(method: &str, uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_counters_and_advisory_timeout() {
    let mut app = app();

    let response = app
        .call(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["submit_timeout_ms"], 5000);
}

#[tokio::test]
async fn preflight_allows_the_patch_method() {
    let mut app = app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/orders/order-http-aaaaaa")
        .header(header::ORIGIN, "https://pos.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "authorization,content-type",
        )
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await.unwrap();

    let allowed = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .expect("preflight exposes allowed methods")
        .to_str()
        .unwrap();
    assert!(allowed.contains("PATCH"));
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn orders_round_trip_through_the_envelope() {
    let mut app = app();

    let response = app
        .call(json_request(
            "POST",
            "/api/orders",
            &takeaway("order-http-bbbbbb"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["code"], "E0000");
    assert_eq!(body["data"]["id"], "order-http-bbbbbb");

    let response = app
        .call(
            Request::get("/api/orders/order-http-bbbbbb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["total"], 4.86);
}

#[tokio::test]
async fn table_patch_on_takeaway_is_rejected_at_the_surface() {
    let mut app = app();

    let response = app
        .call(json_request(
            "POST",
            "/api/orders",
            &takeaway("order-http-cccccc"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .call(json_request(
            "PATCH",
            "/api/orders/order-http-cccccc",
            &serde_json::json!({ "tableNumber": "5" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "E0002");

    let response = app
        .call(
            Request::get("/api/orders/order-http-cccccc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"]["tableNumber"].is_null());
    assert_eq!(body["data"]["orderType"], "takeaway");
}
