//! Order Store
//!
//! Canonical source of truth for orders: an in-memory map keyed by order
//! id behind a coarse `RwLock`, so per-order updates are serialized and
//! the transition event stream a consumer observes matches the store
//! history.
//!
//! The store owns all order validation: payload checks at create, the
//! state machine on status patches, and the idempotency rule that makes
//! client retries safe.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared::models::{Order, OrderPatch, OrderStatus, OrderType, Priority, Source};
use shared::pricing;
use shared::util::now_millis;

use crate::utils::{AppError, AppResult};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

/// Result of a create call
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A new record was inserted
    Created(Order),
    /// The id already existed with an identical payload; no second record
    Duplicate(Order),
}

impl CreateOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Duplicate(order) => order,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, CreateOutcome::Duplicate(_))
    }
}

/// Result of an update call
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub order: Order,
    /// Old/new pair when the patch moved the state machine, so the caller
    /// emits exactly one transition event per accepted change
    pub status_change: Option<(OrderStatus, OrderStatus)>,
}

/// Secondary filters for list queries
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub source: Option<Source>,
    /// Case-insensitive substring match on the customer name
    pub customer: Option<String>,
    pub barista_id: Option<String>,
    /// Creation timestamp range, inclusive bounds (epoch millis)
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(source) = self.source
            && order.source != source
        {
            return false;
        }
        if let Some(needle) = &self.customer {
            let name = order
                .customer
                .as_ref()
                .and_then(|c| c.name.as_deref())
                .unwrap_or("");
            if !name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(barista) = &self.barista_id
            && order.barista_id.as_deref() != Some(barista.as_str())
        {
            return false;
        }
        if let Some(from) = self.from
            && order.timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to
            && order.timestamp > to
        {
            return false;
        }
        true
    }
}

/// Normalized pagination window
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// Apply the default and the cap
    pub fn normalize(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::normalize(None, None)
    }
}

/// One page of a list query
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub orders: Vec<Order>,
    /// Matching records before pagination
    pub total: usize,
    pub has_more: bool,
}

struct Entry {
    /// Insertion sequence, breaks creation-timestamp ties in list order
    seq: u64,
    order: Order,
}

struct StoreInner {
    next_seq: u64,
    orders: HashMap<String, Entry>,
}

/// In-memory order store
pub struct OrderStore {
    inner: RwLock<StoreInner>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                next_seq: 0,
                orders: HashMap::new(),
            }),
        }
    }

    /// Validate and insert an order
    ///
    /// The server stamps `status=pending`, `updatedAt` and the derived
    /// priority; the client-chosen creation `timestamp` is preserved so
    /// offline orders keep their real creation instant.
    pub fn create(&self, mut order: Order) -> AppResult<CreateOutcome> {
        validate_payload(&order)?;

        let mut inner = self.inner.write();
        if let Some(existing) = inner.orders.get(&order.id) {
            if existing.order.payload_matches(&order) {
                tracing::debug!(order_id = %order.id, "duplicate create, returning existing");
                return Ok(CreateOutcome::Duplicate(existing.order.clone()));
            }
            return Err(AppError::Conflict(format!(
                "order {} already exists with a different payload",
                order.id
            )));
        }

        order.status = OrderStatus::Pending;
        order.priority = Priority::derive(order.total, order.priority);
        order.updated_at = Some(now_millis());

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.orders.insert(
            order.id.clone(),
            Entry {
                seq,
                order: order.clone(),
            },
        );

        Ok(CreateOutcome::Created(order))
    }

    /// Fetch a single order
    pub fn get(&self, id: &str) -> AppResult<Order> {
        self.inner
            .read()
            .orders
            .get(id)
            .map(|entry| entry.order.clone())
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    /// Merge-patch mutable fields, running status changes through the
    /// state machine under the write lock
    pub fn update(&self, id: &str, patch: &OrderPatch) -> AppResult<UpdateOutcome> {
        if patch.is_empty() {
            return Err(AppError::Validation("patch contains no fields".into()));
        }
        if let Some(feedback) = &patch.feedback
            && !(1..=5).contains(&feedback.rating)
        {
            return Err(AppError::Validation(format!(
                "feedback rating must be 1-5, got {}",
                feedback.rating
            )));
        }
        if let Some(table) = &patch.table_number
            && table.trim().is_empty()
        {
            return Err(AppError::Validation("table number must not be blank".into()));
        }

        let mut inner = self.inner.write();
        let entry = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        let order = &mut entry.order;

        // Validate against the stored record before touching anything, so a
        // rejected patch leaves it untouched
        if patch.table_number.is_some() && order.order_type != OrderType::DineIn {
            return Err(AppError::Validation(
                "table number is only valid for dine-in orders".into(),
            ));
        }
        let status_change = match patch.status {
            Some(next) => {
                order.status.validate_transition(next)?;
                Some((order.status, next))
            }
            None => None,
        };

        if let Some((_, next)) = status_change {
            order.status = next;
        }
        if let Some(payment_status) = patch.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(barista_id) = &patch.barista_id {
            order.barista_id = Some(barista_id.clone());
        }
        if let Some(estimated_time) = patch.estimated_time {
            order.estimated_time = Some(estimated_time);
        }
        if let Some(feedback) = &patch.feedback {
            order.feedback = Some(feedback.clone());
        }
        if let Some(priority) = patch.priority {
            order.priority = priority;
        }
        if let Some(table_number) = &patch.table_number {
            order.table_number = Some(table_number.clone());
        }
        order.updated_at = Some(now_millis());

        Ok(UpdateOutcome {
            order: order.clone(),
            status_change,
        })
    }

    /// Filtered, newest-first page of orders
    pub fn list(&self, filter: &OrderFilter, page: Pagination) -> Page {
        let inner = self.inner.read();
        let mut matched: Vec<(&u64, &Order)> = inner
            .orders
            .values()
            .filter(|entry| filter.matches(&entry.order))
            .map(|entry| (&entry.seq, &entry.order))
            .collect();

        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| seq_b.cmp(seq_a))
        });

        let total = matched.len();
        let orders: Vec<Order> = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|(_, order)| order.clone())
            .collect();
        let has_more = page.offset + orders.len() < total;

        Page {
            orders,
            total,
            has_more,
        }
    }

    /// Snapshot of every order, for the stats aggregator
    pub fn snapshot(&self) -> Vec<Order> {
        self.inner
            .read()
            .orders
            .values()
            .map(|entry| entry.order.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().orders.is_empty()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Create-time payload checks
fn validate_payload(order: &Order) -> AppResult<()> {
    if order.id.trim().is_empty() {
        return Err(AppError::Validation("order id must not be empty".into()));
    }

    let dine_in = order.order_type == OrderType::DineIn;
    let has_table = order
        .table_number
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if dine_in && !has_table {
        return Err(AppError::Validation(
            "dine-in orders require a table number".into(),
        ));
    }
    if !dine_in && has_table {
        return Err(AppError::Validation(
            "table number is only valid for dine-in orders".into(),
        ));
    }

    pricing::verify_stored_totals(order)?;
    Ok(())
}

#[cfg(test)]
mod tests;
