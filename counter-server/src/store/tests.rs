use std::collections::BTreeSet;

use shared::models::{
    CustomerInfo, DrinkSize, Feedback, OrderItem, OrderType, PaymentStatus, Source,
};
use shared::util::now_millis;

use super::*;

fn latte(quantity: u32) -> OrderItem {
    OrderItem {
        drink_id: "drink-latte".to_string(),
        name: "Latte".to_string(),
        size: DrinkSize::Medium,
        unit_price: 4.50,
        quantity,
        customizations: BTreeSet::new(),
        special_instructions: None,
        allergen_warnings: BTreeSet::new(),
    }
}

/// Takeaway order with totals the verifier accepts: 2x 4.50 = 9.00
/// subtotal, 0.72 tax, 9.72 total.
fn takeaway(id: &str) -> Order {
    Order {
        id: id.to_string(),
        items: vec![latte(2)],
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        order_type: OrderType::Takeaway,
        table_number: None,
        priority: Priority::Normal,
        source: Source::Pos,
        subtotal: 9.00,
        tax: 0.72,
        discount: 0.0,
        tip: 0.0,
        total: 9.72,
        timestamp: now_millis(),
        updated_at: None,
        customer: None,
        barista_id: None,
        estimated_time: Some(6),
        feedback: None,
        location_id: None,
    }
}

fn advance(store: &OrderStore, id: &str, to: OrderStatus) -> UpdateOutcome {
    store.update(id, &OrderPatch::status(to)).unwrap()
}

#[test]
fn create_stamps_server_fields() {
    let store = OrderStore::new();
    let mut incoming = takeaway("order-1-aaaaaa");
    incoming.status = OrderStatus::Ready; // client cannot pick a status

    let outcome = store.create(incoming).unwrap();
    let order = outcome.order();
    assert!(!outcome.is_duplicate());
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.updated_at.is_some());

    let fetched = store.get("order-1-aaaaaa").unwrap();
    assert_eq!(fetched.total, 9.72);
}

#[test]
fn priority_is_raised_for_large_totals() {
    let store = OrderStore::new();
    let mut big = takeaway("order-2-aaaaaa");
    big.items = vec![latte(12)]; // 54.00
    big.subtotal = 54.0;
    big.tax = 4.32;
    big.total = 58.32;

    let outcome = store.create(big).unwrap();
    assert_eq!(outcome.order().priority, Priority::High);
}

#[test]
fn duplicate_create_returns_existing_record() {
    let store = OrderStore::new();
    store.create(takeaway("order-3-aaaaaa")).unwrap();

    let outcome = store.create(takeaway("order-3-aaaaaa")).unwrap();
    assert!(outcome.is_duplicate());
    assert_eq!(store.len(), 1);
}

#[test]
fn divergent_payload_conflicts() {
    let store = OrderStore::new();
    store.create(takeaway("order-4-aaaaaa")).unwrap();

    let mut divergent = takeaway("order-4-aaaaaa");
    divergent.items = vec![latte(1)];
    divergent.subtotal = 4.50;
    divergent.tax = 0.36;
    divergent.total = 4.86;

    assert!(matches!(
        store.create(divergent),
        Err(AppError::Conflict(_))
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn dine_in_requires_table_and_takeaway_forbids_it() {
    let store = OrderStore::new();

    let mut dine_in = takeaway("order-5-aaaaaa");
    dine_in.order_type = OrderType::DineIn;
    assert!(matches!(
        store.create(dine_in),
        Err(AppError::Validation(_))
    ));

    let mut tabled_takeaway = takeaway("order-6-aaaaaa");
    tabled_takeaway.table_number = Some("12".to_string());
    assert!(matches!(
        store.create(tabled_takeaway),
        Err(AppError::Validation(_))
    ));

    let mut valid_dine_in = takeaway("order-7-aaaaaa");
    valid_dine_in.order_type = OrderType::DineIn;
    valid_dine_in.table_number = Some("12".to_string());
    assert!(store.create(valid_dine_in).is_ok());
}

#[test]
fn table_patch_requires_a_dine_in_order() {
    let store = OrderStore::new();
    store.create(takeaway("order-15-aaaaaa")).unwrap();

    let patch = OrderPatch {
        table_number: Some("5".to_string()),
        ..OrderPatch::default()
    };
    let err = store.update("order-15-aaaaaa", &patch).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(store.get("order-15-aaaaaa").unwrap().table_number, None);

    let mut seated = takeaway("order-16-aaaaaa");
    seated.order_type = OrderType::DineIn;
    seated.table_number = Some("3".to_string());
    store.create(seated).unwrap();

    let moved = store.update("order-16-aaaaaa", &patch).unwrap();
    assert_eq!(moved.order.table_number.as_deref(), Some("5"));

    let blank = OrderPatch {
        table_number: Some("   ".to_string()),
        ..OrderPatch::default()
    };
    assert!(matches!(
        store.update("order-16-aaaaaa", &blank),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn mismatched_totals_are_rejected() {
    let store = OrderStore::new();
    let mut wrong = takeaway("order-8-aaaaaa");
    wrong.total = 11.72;
    assert!(matches!(store.create(wrong), Err(AppError::Validation(_))));
}

#[test]
fn forward_transitions_report_the_change() {
    let store = OrderStore::new();
    store.create(takeaway("order-9-aaaaaa")).unwrap();

    let outcome = advance(&store, "order-9-aaaaaa", OrderStatus::Preparing);
    assert_eq!(
        outcome.status_change,
        Some((OrderStatus::Pending, OrderStatus::Preparing))
    );

    advance(&store, "order-9-aaaaaa", OrderStatus::Ready);
    let outcome = advance(&store, "order-9-aaaaaa", OrderStatus::Completed);
    assert_eq!(
        outcome.status_change,
        Some((OrderStatus::Ready, OrderStatus::Completed))
    );
}

#[test]
fn skipping_a_state_is_rejected_without_mutation() {
    let store = OrderStore::new();
    store.create(takeaway("order-10-aaaaaa")).unwrap();

    let err = store
        .update("order-10-aaaaaa", &OrderPatch::status(OrderStatus::Ready))
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
    assert_eq!(
        store.get("order-10-aaaaaa").unwrap().status,
        OrderStatus::Pending
    );
}

#[test]
fn terminal_orders_refuse_status_changes() {
    let store = OrderStore::new();
    store.create(takeaway("order-11-aaaaaa")).unwrap();
    advance(&store, "order-11-aaaaaa", OrderStatus::Preparing);
    advance(&store, "order-11-aaaaaa", OrderStatus::Ready);
    advance(&store, "order-11-aaaaaa", OrderStatus::Completed);

    let err = store
        .update(
            "order-11-aaaaaa",
            &OrderPatch::status(OrderStatus::Cancelled),
        )
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));
}

#[test]
fn feedback_lands_on_completed_orders() {
    let store = OrderStore::new();
    store.create(takeaway("order-12-aaaaaa")).unwrap();
    advance(&store, "order-12-aaaaaa", OrderStatus::Preparing);
    advance(&store, "order-12-aaaaaa", OrderStatus::Ready);
    advance(&store, "order-12-aaaaaa", OrderStatus::Completed);

    let patch = OrderPatch {
        feedback: Some(Feedback {
            rating: 5,
            comment: Some("great".to_string()),
        }),
        ..OrderPatch::default()
    };
    let outcome = store.update("order-12-aaaaaa", &patch).unwrap();
    assert!(outcome.status_change.is_none());
    assert_eq!(outcome.order.feedback.unwrap().rating, 5);
}

#[test]
fn out_of_range_feedback_is_rejected() {
    let store = OrderStore::new();
    store.create(takeaway("order-13-aaaaaa")).unwrap();

    let patch = OrderPatch {
        feedback: Some(Feedback {
            rating: 6,
            comment: None,
        }),
        ..OrderPatch::default()
    };
    assert!(matches!(
        store.update("order-13-aaaaaa", &patch),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn empty_patches_are_rejected() {
    let store = OrderStore::new();
    store.create(takeaway("order-14-aaaaaa")).unwrap();
    assert!(matches!(
        store.update("order-14-aaaaaa", &OrderPatch::default()),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn list_is_newest_first_with_insertion_tiebreak() {
    let store = OrderStore::new();
    let stamp = now_millis();
    for i in 0..3 {
        let mut order = takeaway(&format!("order-tie-{i}"));
        order.timestamp = stamp; // identical creation instant
        store.create(order).unwrap();
    }

    let page = store.list(&OrderFilter::default(), Pagination::default());
    let ids: Vec<&str> = page.orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["order-tie-2", "order-tie-1", "order-tie-0"]);
}

#[test]
fn list_filters_and_paginates() {
    let store = OrderStore::new();
    for i in 0..5 {
        let mut order = takeaway(&format!("order-page-{i}"));
        order.timestamp = 1_000 + i;
        if i % 2 == 0 {
            order.customer = Some(CustomerInfo {
                name: Some("Dana Smith".to_string()),
                phone: None,
                loyalty_tier: None,
            });
        }
        store.create(order).unwrap();
    }
    advance(&store, "order-page-0", OrderStatus::Preparing);

    let by_status = store.list(
        &OrderFilter {
            status: Some(OrderStatus::Preparing),
            ..OrderFilter::default()
        },
        Pagination::default(),
    );
    assert_eq!(by_status.total, 1);
    assert_eq!(by_status.orders[0].id, "order-page-0");

    let by_customer = store.list(
        &OrderFilter {
            customer: Some("dana".to_string()),
            ..OrderFilter::default()
        },
        Pagination::default(),
    );
    assert_eq!(by_customer.total, 3);

    let window = store.list(
        &OrderFilter::default(),
        Pagination {
            limit: 2,
            offset: 2,
        },
    );
    assert_eq!(window.total, 5);
    assert_eq!(window.orders.len(), 2);
    assert!(window.has_more);
    let ids: Vec<&str> = window.orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["order-page-2", "order-page-1"]);

    let tail = store.list(
        &OrderFilter::default(),
        Pagination {
            limit: 2,
            offset: 4,
        },
    );
    assert_eq!(tail.orders.len(), 1);
    assert!(!tail.has_more);
}

#[test]
fn limit_is_capped() {
    let page = Pagination::normalize(Some(10_000), None);
    assert_eq!(page.limit, 200);
    let page = Pagination::normalize(None, None);
    assert_eq!(page.limit, 50);
}
