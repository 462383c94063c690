//! # Checkout Pricing
//!
//! The cart-to-order pipeline in three steps:
//!
//! 1. [`revalidate`] — resolve each requested line against authoritative
//!    product state. Prices come from the catalog, never from the client.
//!    Every problem is collected so the shopper sees all of them at once.
//! 2. [`PricingPolicy::quote`] — subtotal, shipping, tax, total.
//! 3. [`plan_deductions`] — the stock decrements the store must apply when
//!    the order is created.
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! shipping = 0                      if cart is empty
//!          = 0                      if subtotal ≥ free_shipping_threshold
//!          = flat_shipping          otherwise
//! tax      = round_half_up(subtotal × tax_rate_bps / 10 000)
//! total    = subtotal + shipping + tax
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartLine;
use crate::error::ValidationError;
use crate::money::Money;

/// Authoritative product state at the moment of checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSnapshot {
    /// Product display name.
    pub name: String,
    /// Current catalog price per unit.
    pub unit_price: Money,
    /// Units on hand.
    pub stock: u32,
    /// Whether the product is listed for sale.
    pub active: bool,
}

/// A cart line resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// Product being bought.
    pub product_id: Uuid,
    /// Product name at the time of pricing.
    pub name: String,
    /// Catalog price per unit.
    pub unit_price: Money,
    /// Units requested.
    pub quantity: u32,
    /// `unit_price × quantity`.
    pub line_total: Money,
}

/// A reason a line cannot be fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockIssue {
    /// The product no longer exists.
    NotFound {
        /// Requested product.
        product_id: Uuid,
    },
    /// The product exists but is not for sale.
    Unavailable {
        /// Requested product.
        product_id: Uuid,
        /// Product name.
        name: String,
    },
    /// Fewer units on hand than requested.
    InsufficientStock {
        /// Requested product.
        product_id: Uuid,
        /// Product name.
        name: String,
        /// Units requested.
        requested: u32,
        /// Units on hand.
        available: u32,
    },
}

impl StockIssue {
    /// The product this issue concerns.
    pub fn product_id(&self) -> Uuid {
        match self {
            Self::NotFound { product_id }
            | Self::Unavailable { product_id, .. }
            | Self::InsufficientStock { product_id, .. } => *product_id,
        }
    }
}

impl std::fmt::Display for StockIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { product_id } => write!(f, "product {product_id} no longer exists"),
            Self::Unavailable { name, .. } => write!(f, "{name} is no longer available"),
            Self::InsufficientStock {
                name,
                requested,
                available,
                ..
            } => write!(f, "only {available} of {name} left (requested {requested})"),
        }
    }
}

/// A stock decrement to apply at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDeduction {
    /// Product to decrement.
    pub product_id: Uuid,
    /// Units to remove.
    pub quantity: u32,
}

/// Shipping and tax parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Money,
    /// Shipping charged below the threshold.
    pub flat_shipping: Money,
    /// Sales tax on the subtotal, in basis points.
    pub tax_rate_bps: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::from_cents(50_00),
            flat_shipping: Money::from_cents(5_99),
            tax_rate_bps: 800,
        }
    }
}

/// Price breakdown for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Total units.
    pub item_count: u32,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Shipping charge.
    pub shipping: Money,
    /// Tax on the subtotal.
    pub tax: Money,
    /// `subtotal + shipping + tax`.
    pub total: Money,
}

impl PricingPolicy {
    /// Shipping charge for a given subtotal. An empty cart ships for free.
    pub fn shipping_for(&self, subtotal: Money, item_count: u32) -> Money {
        if item_count == 0 || subtotal >= self.free_shipping_threshold {
            Money::ZERO
        } else {
            self.flat_shipping
        }
    }

    /// Compute the full breakdown for priced lines.
    pub fn quote(&self, lines: &[PricedLine]) -> Result<Quote, ValidationError> {
        let subtotal = Money::checked_sum(lines.iter().map(|l| l.line_total))?;
        let item_count = lines
            .iter()
            .try_fold(0u32, |acc, l| acc.checked_add(l.quantity))
            .ok_or(ValidationError::AmountOverflow)?;
        let shipping = self.shipping_for(subtotal, item_count);
        let tax = subtotal.percent_bps(self.tax_rate_bps);
        let total = subtotal.checked_add(shipping)?.checked_add(tax)?;

        Ok(Quote {
            item_count,
            subtotal,
            shipping,
            tax,
            total,
        })
    }
}

/// Resolve requested lines against authoritative product state.
///
/// Returns the priced lines in request order, or every issue found.
/// A line with zero quantity is skipped.
pub fn revalidate(
    requested: &[CartLine],
    authoritative: &HashMap<Uuid, StockSnapshot>,
) -> Result<Vec<PricedLine>, Vec<StockIssue>> {
    let mut priced = Vec::with_capacity(requested.len());
    let mut issues = Vec::new();

    for line in requested.iter().filter(|l| l.quantity > 0) {
        let Some(snapshot) = authoritative.get(&line.product_id) else {
            issues.push(StockIssue::NotFound {
                product_id: line.product_id,
            });
            continue;
        };

        if !snapshot.active {
            issues.push(StockIssue::Unavailable {
                product_id: line.product_id,
                name: snapshot.name.clone(),
            });
            continue;
        }

        if snapshot.stock < line.quantity {
            issues.push(StockIssue::InsufficientStock {
                product_id: line.product_id,
                name: snapshot.name.clone(),
                requested: line.quantity,
                available: snapshot.stock,
            });
            continue;
        }

        match snapshot.unit_price.checked_mul(line.quantity) {
            Ok(line_total) => priced.push(PricedLine {
                product_id: line.product_id,
                name: snapshot.name.clone(),
                unit_price: snapshot.unit_price,
                quantity: line.quantity,
                line_total,
            }),
            // An unrepresentable line total cannot be sold.
            Err(_) => issues.push(StockIssue::Unavailable {
                product_id: line.product_id,
                name: snapshot.name.clone(),
            }),
        }
    }

    if issues.is_empty() {
        Ok(priced)
    } else {
        Err(issues)
    }
}

/// Stock decrements for a set of priced lines.
pub fn plan_deductions(lines: &[PricedLine]) -> Vec<StockDeduction> {
    lines
        .iter()
        .map(|l| StockDeduction {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect()
}
