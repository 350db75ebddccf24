//! Cortado Client Library
//!
//! Terminal-side half of the café order pipeline: a [`Cart`] that prices
//! orders through the shared pricing engine, HTTP submission with a
//! bounded timeout, a durable offline queue drained automatically on
//! reconnect, and a supervised live event listener.
//!
//! A point-of-sale terminal wires it together roughly like this: build a
//! [`ClientConfig`], open the [`SubmissionQueue`] at its `queue_path`,
//! hand both plus an [`HttpClient`] to an [`OrderSubmitter`], and spawn
//! [`OrderSubmitter::run`] next to [`LiveEvents::start`]. Orders then go
//! through [`Cart::finalize`] into [`OrderSubmitter::submit`] and land on
//! the counter whether or not the network is up at that moment.

pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod queue;
pub mod submitter;

pub use cart::{Cart, ItemDraft};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, ListOrdersQuery, OrdersPage, PageInfo};
pub use live::LiveEvents;
pub use queue::{QueueError, QueuedSubmission, SubmissionQueue};
pub use submitter::{DrainReport, OrderSubmitter, SubmitOutcome, SubmitTransport};

// Re-export shared types for convenience
pub use shared::message::{EventFrame, EventKind, Topic};
pub use shared::models::{
    CustomerInfo, DrinkSize, Order, OrderItem, OrderPatch, OrderStatus, OrderType, Priority,
    Source,
};
pub use shared::pricing::{PricingPolicy, Promotion};
