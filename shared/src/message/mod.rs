//! Live event wire types
//!
//! Shared between counter-server and every live consumer (kitchen display,
//! admin dashboard, client library). Frames travel as JSON text over the
//! WebSocket in both directions: the server pushes [`EventFrame`]s, the
//! client sends [`SubscribeFrame`]s.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::{Notification, Order, OrderStatus};
use crate::util::now_millis;

/// Subscription topic, `location:<id>` carries the scoping location id.
///
/// Serialized as its wire string (`orders`, `kitchen`, `notifications`,
/// `admin`, `location:<id>`) so topic lists read naturally in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Topic {
    /// Every order lifecycle event
    Orders,
    /// Kitchen-relevant events (placed orders and status changes)
    Kitchen,
    /// Operational notifications
    Notifications,
    /// Everything, restricted to manager/admin roles
    Admin,
    /// Events tagged with a specific location
    Location(String),
}

#[derive(Debug, Clone, Error)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Orders => write!(f, "orders"),
            Topic::Kitchen => write!(f, "kitchen"),
            Topic::Notifications => write!(f, "notifications"),
            Topic::Admin => write!(f, "admin"),
            Topic::Location(id) => write!(f, "location:{id}"),
        }
    }
}

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders" => Ok(Topic::Orders),
            "kitchen" => Ok(Topic::Kitchen),
            "notifications" => Ok(Topic::Notifications),
            "admin" => Ok(Topic::Admin),
            _ => match s.strip_prefix("location:") {
                Some(id) if !id.is_empty() => Ok(Topic::Location(id.to_string())),
                _ => Err(UnknownTopic(s.to_string())),
            },
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl TryFrom<String> for Topic {
    type Error = UnknownTopic;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Server→client event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new order entered the store
    OrderPlaced,
    /// An order moved through the state machine
    OrderStatusChanged,
    /// Non-status fields of an order changed
    OrderUpdated,
    /// Operational notification
    Notification,
    /// Acknowledges a subscribe/unsubscribe frame
    SubscriptionAck,
    /// Replay of the bounded recent-notification buffer
    RecentNotifications,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::OrderPlaced => write!(f, "order_placed"),
            EventKind::OrderStatusChanged => write!(f, "order_status_changed"),
            EventKind::OrderUpdated => write!(f, "order_updated"),
            EventKind::Notification => write!(f, "notification"),
            EventKind::SubscriptionAck => write!(f, "subscription_ack"),
            EventKind::RecentNotifications => write!(f, "recent_notifications"),
        }
    }
}

/// One server→client frame: `{event_type, payload, timestamp}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event_type: EventKind,
    pub payload: Value,
    /// Publish instant, epoch millis
    pub timestamp: i64,
}

impl EventFrame {
    pub fn new(event_type: EventKind, payload: Value) -> Self {
        Self {
            event_type,
            payload,
            timestamp: now_millis(),
        }
    }

    /// Frame for a freshly created order; payload is the full order
    pub fn order_placed(order: &Order) -> Self {
        Self::new(
            EventKind::OrderPlaced,
            serde_json::to_value(order).expect("Failed to serialize order"),
        )
    }

    /// Frame for a state-machine transition
    pub fn status_changed(order_id: &str, from: OrderStatus, to: OrderStatus) -> Self {
        Self::new(
            EventKind::OrderStatusChanged,
            json!({
                "orderId": order_id,
                "oldStatus": from,
                "newStatus": to,
            }),
        )
    }

    /// Frame for non-status field changes; payload is the updated order
    pub fn order_updated(order: &Order) -> Self {
        Self::new(
            EventKind::OrderUpdated,
            serde_json::to_value(order).expect("Failed to serialize order"),
        )
    }

    pub fn notification(notification: &Notification) -> Self {
        Self::new(
            EventKind::Notification,
            serde_json::to_value(notification).expect("Failed to serialize notification"),
        )
    }

    /// Acknowledges a subscribe/unsubscribe request, echoing the topics
    pub fn subscription_ack(action: SubscribeAction, topics: &[Topic]) -> Self {
        Self::new(
            EventKind::SubscriptionAck,
            json!({
                "action": action,
                "topics": topics,
            }),
        )
    }

    /// Replay of the recent-notification buffer, oldest first
    pub fn recent_notifications(notifications: &[Notification]) -> Self {
        Self::new(
            EventKind::RecentNotifications,
            serde_json::to_value(notifications).expect("Failed to serialize notifications"),
        )
    }

    /// Decode the payload into a concrete type
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeAction {
    Subscribe,
    Unsubscribe,
}

/// One client→server frame: `{action, topics}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeFrame {
    pub action: SubscribeAction,
    pub topics: Vec<Topic>,
}

impl SubscribeFrame {
    pub fn subscribe(topics: Vec<Topic>) -> Self {
        Self {
            action: SubscribeAction::Subscribe,
            topics,
        }
    }

    pub fn unsubscribe(topics: Vec<Topic>) -> Self {
        Self {
            action: SubscribeAction::Unsubscribe,
            topics,
        }
    }
}
