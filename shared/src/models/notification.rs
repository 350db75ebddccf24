//! Broadcast notifications
//!
//! Ephemeral by design: a notification lives on the `notifications` fan-out
//! topic and in the bounded recent-history ring buffer, nothing persists it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::Priority;
use crate::models::status::OrderStatus;
use crate::util::now_millis;

/// Notification category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Order,
    Inventory,
    Payment,
    System,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            priority,
            timestamp: now_millis(),
            read: false,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Notification for a freshly placed order
    pub fn order_placed(order_id: &str, total: f64, priority: Priority) -> Self {
        Self::new(
            NotificationKind::Order,
            "New order",
            format!("Order {order_id} placed (${total:.2})"),
            priority,
        )
        .with_data(serde_json::json!({ "orderId": order_id, "total": total }))
    }

    /// Notification for an applied status transition
    pub fn status_changed(order_id: &str, from: OrderStatus, to: OrderStatus) -> Self {
        let priority = match to {
            OrderStatus::Ready => Priority::High,
            OrderStatus::Cancelled => Priority::High,
            _ => Priority::Normal,
        };
        Self::new(
            NotificationKind::Order,
            match to {
                OrderStatus::Ready => "Order ready",
                OrderStatus::Completed => "Order completed",
                OrderStatus::Cancelled => "Order cancelled",
                _ => "Order update",
            },
            format!("Order {order_id}: {from} -> {to}"),
            priority,
        )
        .with_data(serde_json::json!({
            "orderId": order_id,
            "oldStatus": from,
            "newStatus": to,
        }))
    }
}
