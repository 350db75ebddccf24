//! Pricing engine
//!
//! The single source of truth for order money: every front-end prices
//! through [`price_order`] and the server re-checks stored totals with
//! [`verify_stored_totals`]. All arithmetic runs on `Decimal` internally
//! and is rounded half-away-from-zero to the cent at the boundary.
//!
//! Discount rules stack: loyalty tier, happy hour and ad-hoc promotions
//! are evaluated independently, each off the full subtotal and each capped
//! at the subtotal, then summed. Two 20% rules yield a 40% discount, not
//! 36%. Tax applies to the undiscounted subtotal and is never reduced.

use chrono::{DateTime, Local, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CustomerInfo, LoyaltyTier, Order, OrderItem};
use crate::money::{self, MAX_PRICE, MAX_QUANTITY, to_decimal, to_f64};


/// Pricing failure; `SubtotalMismatch`/`TotalMismatch` are the server-side
/// verification outcomes, the rest reject malformed inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} exceeds maximum allowed ({max}), got {value}")]
    TooLarge {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("quantity must be between 1 and {max}, got {quantity}")]
    InvalidQuantity { quantity: u32, max: u32 },

    #[error("order has no items")]
    EmptyOrder,

    #[error("subtotal {provided} does not match items ({computed})")]
    SubtotalMismatch { provided: f64, computed: f64 },

    #[error("total {provided} does not match subtotal + tax - discount + tip ({computed})")]
    TotalMismatch { provided: f64, computed: f64 },
}

/// How a promotion adjusts the subtotal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// `value` is a percentage of the subtotal (30 = 30%)
    Percentage,
    /// `value` is a flat currency amount
    FixedAmount,
}

/// An active promotion, resolved by the caller (attribute rules, campaign
/// flags) and evaluated here against the subtotal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Promotion {
    pub name: String,
    pub adjustment_type: AdjustmentType,
    /// Percentage (30 = 30%) or fixed currency amount, per `adjustment_type`
    pub value: f64,
}

impl Promotion {
    pub fn percentage(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            adjustment_type: AdjustmentType::Percentage,
            value,
        }
    }

    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            adjustment_type: AdjustmentType::FixedAmount,
            value,
        }
    }
}

/// Recurring daily discount window, local wall-clock hours `[start, end)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HappyHour {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Percentage of subtotal (20 = 20%)
    pub percent: f64,
}

impl HappyHour {
    fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

/// Pricing policy constants, injected rather than read from globals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingPolicy {
    /// Fraction of subtotal (0.08 = 8%)
    pub tax_rate: f64,
    /// Flat surcharge folded into `unit_price` per customization
    pub customization_surcharge: f64,
    /// Loyalty percentages of subtotal: bronze / silver / gold
    pub loyalty_percent: [f64; 3],
    pub happy_hour: Option<HappyHour>,
    /// Prep estimate per unit when the menu provides none (minutes)
    pub default_prep_minutes: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: 0.08,
            customization_surcharge: 0.50,
            loyalty_percent: [5.0, 10.0, 15.0],
            happy_hour: Some(HappyHour {
                start_hour: 15,
                end_hour: 17,
                percent: 20.0,
            }),
            default_prep_minutes: 3,
        }
    }
}

impl PricingPolicy {
    pub fn loyalty_percent(&self, tier: LoyaltyTier) -> f64 {
        match tier {
            LoyaltyTier::Bronze => self.loyalty_percent[0],
            LoyaltyTier::Silver => self.loyalty_percent[1],
            LoyaltyTier::Gold => self.loyalty_percent[2],
        }
    }
}

/// One evaluated discount rule, kept for auditability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub name: String,
    /// Amount in currency unit, already capped at the subtotal
    pub amount: f64,
}

/// Priced order snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricedTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub tip: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_discounts: Vec<AppliedDiscount>,
}

#[inline]
fn require_finite(value: f64, field: &'static str) -> Result<(), PricingError> {
    if !value.is_finite() {
        return Err(PricingError::NonFinite { field });
    }
    Ok(())
}

fn require_money(value: f64, field: &'static str) -> Result<(), PricingError> {
    require_finite(value, field)?;
    if value < 0.0 {
        return Err(PricingError::Negative { field, value });
    }
    if value > MAX_PRICE {
        return Err(PricingError::TooLarge {
            field,
            value,
            max: MAX_PRICE,
        });
    }
    Ok(())
}

/// Validate a line item before any computation
pub fn validate_item(item: &OrderItem) -> Result<(), PricingError> {
    require_money(item.unit_price, "unit_price")?;
    if item.quantity == 0 || item.quantity > MAX_QUANTITY {
        return Err(PricingError::InvalidQuantity {
            quantity: item.quantity,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

/// Per-unit price with the per-customization surcharge folded in.
///
/// Called once when the item is added to the cart; the result is stored on
/// the item and never recomputed, so later policy changes do not reprice
/// an open cart.
pub fn unit_price_with_surcharge(
    base_price: f64,
    customization_count: usize,
    policy: &PricingPolicy,
) -> Result<f64, PricingError> {
    require_money(base_price, "base_price")?;
    let surcharge =
        to_decimal(policy.customization_surcharge) * Decimal::from(customization_count as u64);
    Ok(to_f64(to_decimal(base_price) + surcharge))
}

/// Subtotal over validated items: `Σ unit_price × quantity`
fn subtotal_decimal(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .map(|item| to_decimal(item.unit_price) * Decimal::from(item.quantity))
        .sum()
}

/// Advisory prep estimate: `Σ per-item prep minutes × quantity`
pub fn estimate_prep_minutes(lines: impl IntoIterator<Item = (u32, u32)>) -> u32 {
    lines
        .into_iter()
        .map(|(prep_minutes, quantity)| prep_minutes.saturating_mul(quantity))
        .fold(0, u32::saturating_add)
}

/// Price an order: pure function of items, discount context, tip and clock.
///
/// `at` feeds only the happy-hour window check, keeping the computation
/// reproducible for a given instant.
pub fn price_order(
    items: &[OrderItem],
    customer: Option<&CustomerInfo>,
    promotions: &[Promotion],
    tip: f64,
    at: DateTime<Local>,
    policy: &PricingPolicy,
) -> Result<PricedTotals, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyOrder);
    }
    for item in items {
        validate_item(item)?;
    }
    require_money(tip, "tip")?;
    for promo in promotions {
        require_finite(promo.value, "promotion value")?;
        if promo.value < 0.0 {
            return Err(PricingError::Negative {
                field: "promotion value",
                value: promo.value,
            });
        }
    }

    let subtotal = subtotal_decimal(items);
    let hundred = Decimal::ONE_HUNDRED;

    let mut applied: Vec<AppliedDiscount> = Vec::new();
    let mut push_rule = |name: String, raw: Decimal| {
        // each rule caps at the subtotal independently
        let amount = money::round_money(raw.min(subtotal));
        if amount > Decimal::ZERO {
            applied.push(AppliedDiscount {
                name,
                amount: to_f64(amount),
            });
        }
        amount
    };

    let mut discount = Decimal::ZERO;

    if let Some(tier) = customer.and_then(|c| c.loyalty_tier) {
        let percent = to_decimal(policy.loyalty_percent(tier));
        if percent > Decimal::ZERO {
            discount += push_rule(
                format!("loyalty:{tier:?}").to_lowercase(),
                subtotal * percent / hundred,
            );
        }
    }

    if let Some(hh) = &policy.happy_hour {
        if hh.contains(at.hour()) {
            discount += push_rule(
                "happy_hour".to_string(),
                subtotal * to_decimal(hh.percent) / hundred,
            );
        }
    }

    for promo in promotions {
        let raw = match promo.adjustment_type {
            AdjustmentType::Percentage => subtotal * to_decimal(promo.value) / hundred,
            AdjustmentType::FixedAmount => to_decimal(promo.value),
        };
        discount += push_rule(promo.name.clone(), raw);
    }

    let tax = money::round_money(subtotal * to_decimal(policy.tax_rate));
    let total = (subtotal + tax - discount + to_decimal(tip)).max(Decimal::ZERO);

    Ok(PricedTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        discount: to_f64(discount),
        tip: to_f64(to_decimal(tip)),
        total: to_f64(total),
        applied_discounts: applied,
    })
}

/// Server-side verification of client-priced totals.
///
/// The server has no discount context, so it checks what it can: the
/// subtotal really is the sum of the items, and the stored fields satisfy
/// the total identity. Both within one cent; discounts themselves are
/// taken on trust from the single pricing engine.
pub fn verify_stored_totals(order: &Order) -> Result<(), PricingError> {
    if order.items.is_empty() {
        return Err(PricingError::EmptyOrder);
    }
    for item in &order.items {
        validate_item(item)?;
    }
    require_money(order.subtotal, "subtotal")?;
    require_money(order.tax, "tax")?;
    require_money(order.discount, "discount")?;
    require_money(order.tip, "tip")?;
    require_money(order.total, "total")?;

    let computed_subtotal = subtotal_decimal(&order.items);
    if (computed_subtotal - to_decimal(order.subtotal)).abs() >= money::MONEY_TOLERANCE {
        return Err(PricingError::SubtotalMismatch {
            provided: order.subtotal,
            computed: to_f64(computed_subtotal),
        });
    }

    let identity = (to_decimal(order.subtotal) + to_decimal(order.tax) - to_decimal(order.discount)
        + to_decimal(order.tip))
    .max(Decimal::ZERO);
    if (identity - to_decimal(order.total)).abs() >= money::MONEY_TOLERANCE {
        return Err(PricingError::TotalMismatch {
            provided: order.total,
            computed: to_f64(identity),
        });
    }

    Ok(())
}
