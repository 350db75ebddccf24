//! Order Model

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::money;
use crate::models::status::OrderStatus;

/// Payment status, an axis independent from fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Service type; `table_number` is required iff `DineIn`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Takeaway,
    DineIn,
    Delivery,
}

/// Origin channel, informational only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    Pos,
    MobileApp,
    QrCode,
    Voice,
    Online,
}

/// Cup size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DrinkSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Kitchen priority. Ordered so the server can raise a submitted priority
/// to the total-derived minimum without ever lowering an explicit flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Urgent,
}

/// Orders totalling at least this much are treated as high priority
pub const HIGH_PRIORITY_TOTAL: f64 = 50.0;
/// Orders totalling at least this much are treated as urgent
pub const URGENT_PRIORITY_TOTAL: f64 = 100.0;

impl Priority {
    /// Derive priority from the order total; an explicit flag only ever
    /// raises the result.
    pub fn derive(total: f64, explicit: Priority) -> Priority {
        let from_total = if total >= URGENT_PRIORITY_TOTAL {
            Priority::Urgent
        } else if total >= HIGH_PRIORITY_TOTAL {
            Priority::High
        } else {
            Priority::Normal
        };
        explicit.max(from_total)
    }
}

/// Loyalty tier, consumed by the pricing engine as discount context
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
}

/// Customer association (pricing context, not an account record)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_tier: Option<LoyaltyTier>,
}

/// Post-completion customer feedback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Rating from 1 to 5
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Order line item
///
/// Immutable once added to an order except `quantity`, which the cart may
/// adjust pre-submission. `unit_price` already includes the
/// per-customization surcharge folded in when the item was added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub drink_id: String,
    pub name: String,
    pub size: DrinkSize,
    /// Price per unit in currency unit, surcharge included
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub customizations: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub allergen_warnings: BTreeSet<String>,
}

impl OrderItem {
    /// Line-item equivalence for idempotent resubmission checks:
    /// everything exact except `unit_price`, compared within one cent.
    fn matches(&self, other: &OrderItem) -> bool {
        self.drink_id == other.drink_id
            && self.name == other.name
            && self.size == other.size
            && self.quantity == other.quantity
            && self.customizations == other.customizations
            && money::money_eq(self.unit_price, other.unit_price)
    }
}

/// Order entity
///
/// `id` is assigned client-side (`order-<epoch_ms>-<suffix>`, see
/// [`crate::util::generate_order_id`]) and doubles as the idempotency key.
/// Monetary fields are computed by the pricing engine and stored; the
/// server verifies them but never recomputes discounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub source: Source,
    /// Amount in currency unit
    pub subtotal: f64,
    /// Amount in currency unit
    pub tax: f64,
    /// Amount in currency unit
    pub discount: f64,
    /// Amount in currency unit
    pub tip: f64,
    /// Amount in currency unit
    pub total: f64,
    /// Creation time (epoch milliseconds), never overwritten
    pub timestamp: i64,
    /// Stamped by the store on every accepted update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barista_id: Option<String>,
    /// Advisory prep estimate in minutes; never gates transitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    /// Store-location tag used only for `location:<id>` fan-out scoping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

impl Order {
    /// Whether a resubmitted payload is the same order.
    ///
    /// Items, order type, source, table and customer must match exactly;
    /// monetary fields compare within one cent so a client that re-rounded
    /// is still recognized. Status and server-stamped fields are ignored:
    /// the original may already have progressed.
    pub fn payload_matches(&self, other: &Order) -> bool {
        self.id == other.id
            && self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| a.matches(b))
            && self.order_type == other.order_type
            && self.source == other.source
            && self.table_number == other.table_number
            && self.customer == other.customer
            && money::money_eq(self.subtotal, other.subtotal)
            && money::money_eq(self.tax, other.tax)
            && money::money_eq(self.discount, other.discount)
            && money::money_eq(self.tip, other.tip)
            && money::money_eq(self.total, other.total)
    }
}

/// Merge-patch body for `PATCH /orders/{id}`
///
/// Only the mutable associations appear here; unknown fields (items,
/// monetary amounts, id, timestamp) are rejected at deserialization so an
/// attempt to rewrite them surfaces as a validation error instead of being
/// silently dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barista_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
}

impl OrderPatch {
    /// A status-only patch, the common kitchen-display case
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.payment_status.is_none()
            && self.barista_id.is_none()
            && self.estimated_time.is_none()
            && self.feedback.is_none()
            && self.priority.is_none()
            && self.table_number.is_none()
    }
}
