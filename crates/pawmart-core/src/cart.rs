//! # Cart Arithmetic
//!
//! A cart holds at most one line per product. Quantities merge on add and
//! are capped per line. Prices are not stored here: they are resolved from
//! the catalog at read time and re-validated at checkout.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CartError;

/// Maximum quantity of a single product on one line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Maximum number of distinct products in one cart.
pub const MAX_CART_LINES: usize = 50;

/// One product line in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product being bought.
    pub product_id: Uuid,
    /// Number of units, always at least one.
    pub quantity: u32,
}

/// An ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in insertion order.
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Quantity currently held for a product, zero if absent.
    pub fn quantity_of(&self, product_id: &Uuid) -> u32 {
        self.lines
            .iter()
            .find(|l| &l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// Returns the resulting line quantity.
    pub fn add(&mut self, product_id: Uuid, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let requested = line.quantity.saturating_add(quantity);
            if requested > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityTooLarge {
                    product_id,
                    requested,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = requested;
            return Ok(requested);
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CartError::TooManyLines {
                max: MAX_CART_LINES,
            });
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                product_id,
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        self.lines.push(CartLine {
            product_id,
            quantity,
        });
        Ok(quantity)
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                product_id,
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;

        if quantity == 0 {
            self.lines.remove(idx);
        } else {
            self.lines[idx].quantity = quantity;
        }
        Ok(())
    }

    /// Remove a product's line.
    pub fn remove(&mut self, product_id: &Uuid) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        if self.lines.len() == before {
            return Err(CartError::LineNotFound(*product_id));
        }
        Ok(())
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
