//! Server State

use std::sync::Arc;

use parking_lot::Mutex;
use shared::message::{EventFrame, Topic};
use shared::models::{Notification, Order, OrderPatch};
use tokio_util::sync::CancellationToken;

use crate::auth::JwtService;
use crate::core::Config;
use crate::fanout::FanoutHub;
use crate::store::{CreateOutcome, OrderStore, UpdateOutcome};
use crate::utils::AppResult;

/// Shared handles for every request and live connection
///
/// Cloning is shallow, every service sits behind an `Arc`. Constructed
/// once at startup and injected through axum's `State` extractor.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<OrderStore>,
    pub hub: Arc<FanoutHub>,
    pub jwt: Arc<JwtService>,
    /// Cancelled once when the process starts shutting down; long-lived
    /// session tasks watch it and close their connections
    pub shutdown: CancellationToken,
    /// Serializes store-commit + publish pairs so events for one order
    /// enter subscriber queues in commit order. Publishing never awaits,
    /// so the critical section stays brief.
    publish_gate: Arc<Mutex<()>>,
}

impl ServerState {
    pub fn initialize(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: Arc::new(OrderStore::new()),
            hub: Arc::new(FanoutHub::new(
                config.fanout_queue_capacity,
                config.notification_buffer_size,
            )),
            jwt: Arc::new(JwtService::with_config(config.jwt.clone())),
            shutdown: CancellationToken::new(),
            publish_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Create an order and fan out the placement event
    ///
    /// Idempotent resubmissions return the stored record and publish
    /// nothing.
    pub fn create_order(&self, order: Order) -> AppResult<CreateOutcome> {
        let _ordering = self.publish_gate.lock();
        let outcome = self.store.create(order)?;
        if let CreateOutcome::Created(order) = &outcome {
            self.hub
                .publish(&order_topics(order), EventFrame::order_placed(order));
            self.broadcast_notification(Notification::order_placed(
                &order.id,
                order.total,
                order.priority,
            ));
        }
        Ok(outcome)
    }

    /// Apply a patch and fan out either the transition or the plain update
    pub fn update_order(&self, id: &str, patch: &OrderPatch) -> AppResult<Order> {
        let _ordering = self.publish_gate.lock();
        let UpdateOutcome {
            order,
            status_change,
        } = self.store.update(id, patch)?;

        let topics = order_topics(&order);
        match status_change {
            Some((from, to)) => {
                self.hub
                    .publish(&topics, EventFrame::status_changed(&order.id, from, to));
                self.broadcast_notification(Notification::status_changed(&order.id, from, to));
            }
            None => {
                self.hub.publish(&topics, EventFrame::order_updated(&order));
            }
        }
        Ok(order)
    }

    /// Ring-buffer the notification for late subscribers, then fan it out
    fn broadcast_notification(&self, notification: Notification) {
        self.hub.push_notification(notification.clone());
        self.hub.publish(
            &[Topic::Notifications, Topic::Admin],
            EventFrame::notification(&notification),
        );
    }
}

/// Order events reach every order-watching audience, plus the store
/// location's scope when the order carries one
fn order_topics(order: &Order) -> Vec<Topic> {
    let mut topics = vec![Topic::Orders, Topic::Kitchen, Topic::Admin];
    if let Some(location) = &order.location_id {
        topics.push(Topic::Location(location.clone()));
    }
    topics
}
