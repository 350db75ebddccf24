//! Order assembly
//!
//! A [`Cart`] collects line items, folds the per-customization surcharge
//! into each unit price through the shared pricing engine, and produces a
//! fully priced [`Order`] ready for submission. The cart owns everything
//! pre-submission: quantity edits, order type, discount context and tip.

use std::collections::BTreeSet;

use chrono::{DateTime, Local};

use shared::models::{
    CustomerInfo, DrinkSize, Order, OrderItem, OrderType, Priority, Source,
};
use shared::money::MAX_QUANTITY;
use shared::pricing::{
    self, PricedTotals, PricingError, PricingPolicy, Promotion,
};
use shared::util::{generate_order_id, now_millis};

use crate::error::{ClientError, ClientResult};

/// Everything needed to add one drink to the cart.
///
/// `base_price` is the menu price before the customization surcharge; the
/// cart computes the final unit price when the draft is added.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    pub drink_id: String,
    pub name: String,
    pub size: DrinkSize,
    pub base_price: f64,
    pub quantity: u32,
    pub customizations: BTreeSet<String>,
    pub special_instructions: Option<String>,
    pub allergen_warnings: BTreeSet<String>,
    /// Per-unit prep minutes; falls back to the policy default
    pub prep_minutes: Option<u32>,
}

impl ItemDraft {
    pub fn new(
        drink_id: impl Into<String>,
        name: impl Into<String>,
        size: DrinkSize,
        base_price: f64,
    ) -> Self {
        Self {
            drink_id: drink_id.into(),
            name: name.into(),
            size,
            base_price,
            quantity: 1,
            customizations: BTreeSet::new(),
            special_instructions: None,
            allergen_warnings: BTreeSet::new(),
            prep_minutes: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_customization(mut self, customization: impl Into<String>) -> Self {
        self.customizations.insert(customization.into());
        self
    }

    pub fn with_special_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }

    pub fn with_allergen_warning(mut self, warning: impl Into<String>) -> Self {
        self.allergen_warnings.insert(warning.into());
        self
    }

    pub fn with_prep_minutes(mut self, minutes: u32) -> Self {
        self.prep_minutes = Some(minutes);
        self
    }
}

/// A priced line plus the prep estimate input that feeds `estimated_time`
#[derive(Debug, Clone)]
struct CartLine {
    item: OrderItem,
    prep_minutes: u32,
}

/// Mutable order under assembly
#[derive(Debug, Clone)]
pub struct Cart {
    policy: PricingPolicy,
    lines: Vec<CartLine>,
    order_type: OrderType,
    table_number: Option<String>,
    source: Source,
    customer: Option<CustomerInfo>,
    promotions: Vec<Promotion>,
    tip: f64,
    priority: Priority,
    location_id: Option<String>,
}

impl Cart {
    pub fn new(policy: PricingPolicy) -> Self {
        Self {
            policy,
            lines: Vec::new(),
            order_type: OrderType::Takeaway,
            table_number: None,
            source: Source::Pos,
            customer: None,
            promotions: Vec::new(),
            tip: 0.0,
            priority: Priority::Normal,
            location_id: None,
        }
    }

    /// Add a drink; returns the index of the line it landed on.
    ///
    /// The surcharge is folded into the unit price here, once. A draft that
    /// matches an existing line (same drink, size, customizations and
    /// instructions) merges into it instead of opening a new line.
    pub fn add(&mut self, draft: ItemDraft) -> ClientResult<usize> {
        let unit_price = pricing::unit_price_with_surcharge(
            draft.base_price,
            draft.customizations.len(),
            &self.policy,
        )?;
        let item = OrderItem {
            drink_id: draft.drink_id,
            name: draft.name,
            size: draft.size,
            unit_price,
            quantity: draft.quantity,
            customizations: draft.customizations,
            special_instructions: draft.special_instructions,
            allergen_warnings: draft.allergen_warnings,
        };
        pricing::validate_item(&item)?;
        let prep_minutes = draft.prep_minutes.unwrap_or(self.policy.default_prep_minutes);

        let existing = self.lines.iter().position(|line| {
            line.item.drink_id == item.drink_id
                && line.item.size == item.size
                && line.item.customizations == item.customizations
                && line.item.special_instructions == item.special_instructions
        });
        match existing {
            Some(index) => {
                let merged = self.lines[index].item.quantity.saturating_add(item.quantity);
                self.set_quantity(index, merged)?;
                Ok(index)
            }
            None => {
                self.lines.push(CartLine { item, prep_minutes });
                Ok(self.lines.len() - 1)
            }
        }
    }

    /// Change a line's quantity; rejects zero and anything past the cap
    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> ClientResult<()> {
        if index >= self.lines.len() {
            return Err(ClientError::Validation(format!(
                "No cart line at index {index}"
            )));
        }
        if quantity == 0 || quantity > MAX_QUANTITY {
            return Err(ClientError::Pricing(PricingError::InvalidQuantity {
                quantity,
                max: MAX_QUANTITY,
            }));
        }
        self.lines[index].item.quantity = quantity;
        Ok(())
    }

    /// Remove a line; returns the removed item if the index was valid
    pub fn remove_line(&mut self, index: usize) -> Option<OrderItem> {
        if index < self.lines.len() {
            Some(self.lines.remove(index).item)
        } else {
            None
        }
    }

    /// Dine-in service at the given table
    pub fn set_dine_in(&mut self, table_number: impl Into<String>) {
        self.order_type = OrderType::DineIn;
        self.table_number = Some(table_number.into());
    }

    pub fn set_takeaway(&mut self) {
        self.order_type = OrderType::Takeaway;
        self.table_number = None;
    }

    pub fn set_delivery(&mut self) {
        self.order_type = OrderType::Delivery;
        self.table_number = None;
    }

    pub fn set_source(&mut self, source: Source) {
        self.source = source;
    }

    pub fn set_customer(&mut self, customer: CustomerInfo) {
        self.customer = Some(customer);
    }

    pub fn add_promotion(&mut self, promotion: Promotion) {
        self.promotions.push(promotion);
    }

    pub fn set_tip(&mut self, tip: f64) {
        self.tip = tip;
    }

    /// Explicit priority flag; the total-derived floor still applies
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn set_location(&mut self, location_id: impl Into<String>) {
        self.location_id = Some(location_id.into());
    }

    pub fn items(&self) -> impl Iterator<Item = &OrderItem> {
        self.lines.iter().map(|line| &line.item)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Price the cart as it stands, without building an order
    pub fn totals(&self, at: DateTime<Local>) -> ClientResult<PricedTotals> {
        let items: Vec<OrderItem> = self.lines.iter().map(|line| line.item.clone()).collect();
        let totals = pricing::price_order(
            &items,
            self.customer.as_ref(),
            &self.promotions,
            self.tip,
            at,
            &self.policy,
        )?;
        Ok(totals)
    }

    /// Turn the cart into a submittable order.
    ///
    /// The generated id doubles as the idempotency key, so retries must
    /// reuse the returned order rather than finalizing again. The cart is
    /// left untouched; clear it once the submission is acknowledged.
    pub fn finalize(&self, at: DateTime<Local>) -> ClientResult<Order> {
        let totals = self.totals(at)?;
        let estimated_time = pricing::estimate_prep_minutes(
            self.lines
                .iter()
                .map(|line| (line.prep_minutes, line.item.quantity)),
        );

        Ok(Order {
            id: generate_order_id(),
            items: self.lines.iter().map(|line| line.item.clone()).collect(),
            status: Default::default(),
            payment_status: Default::default(),
            order_type: self.order_type,
            table_number: self.table_number.clone(),
            priority: Priority::derive(totals.total, self.priority),
            source: self.source,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            tip: totals.tip,
            total: totals.total,
            timestamp: now_millis(),
            updated_at: None,
            customer: self.customer.clone(),
            barista_id: None,
            estimated_time: Some(estimated_time),
            feedback: None,
            location_id: self.location_id.clone(),
        })
    }
}
