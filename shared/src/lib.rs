//! Shared types for the Cortado café POS
//!
//! Domain types and pure computation used by both the counter server and
//! the client library: the order model and its state machine, the pricing
//! engine, money helpers, and the live-event wire protocol.

pub mod message;
pub mod models;
pub mod money;
pub mod pricing;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Domain re-exports (for convenient access)
pub use message::{EventFrame, EventKind, SubscribeAction, SubscribeFrame, Topic};
pub use models::{
    CustomerInfo, Feedback, Notification, NotificationKind, Order, OrderItem, OrderPatch,
    OrderStatus, OrderType, PaymentStatus, Priority, Source, TransitionError,
};
pub use pricing::{PricedTotals, PricingError, PricingPolicy, Promotion};
