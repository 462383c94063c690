//! # Orders
//!
//! Order lifecycle:
//!
//! ```text
//! PENDING ──► PROCESSING ──► SHIPPED ──► DELIVERED
//!    │             │
//!    └─────────────┴──► CANCELLED
//! ```
//!
//! DELIVERED and CANCELLED are terminal. Once an order has shipped it can no
//! longer be cancelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TransitionError, ValidationError};
use crate::fields::{optional_text, require_text};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, awaiting fulfilment.
    Pending,
    /// Being picked and packed.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before shipping. Stock is returned.
    Cancelled,
}

impl OrderStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the order may still be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether `to` is a legal next state.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    /// Validate and return the next state.
    pub fn transition(self, to: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer will pay. Payment is collected on delivery; the
/// storefront never handles card data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash handed to the courier.
    CashOnDelivery,
    /// Card terminal carried by the courier.
    CardOnDelivery,
}

/// Delivery address attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient name.
    pub full_name: String,
    /// Street address.
    pub line1: String,
    /// Apartment, suite, etc.
    #[serde(default)]
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// State or region.
    #[serde(default)]
    pub region: Option<String>,
    /// Postal code.
    pub postal_code: String,
    /// Country.
    pub country: String,
    /// Contact phone for the courier.
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Trim every field and check required ones are present.
    pub fn normalized(&self) -> Result<ShippingAddress, ValidationError> {
        Ok(ShippingAddress {
            full_name: require_text("full_name", &self.full_name, 120)?,
            line1: require_text("line1", &self.line1, 200)?,
            line2: optional_text("line2", self.line2.as_deref(), 200)?,
            city: require_text("city", &self.city, 100)?,
            region: optional_text("region", self.region.as_deref(), 100)?,
            postal_code: require_text("postal_code", &self.postal_code, 20)?,
            country: require_text("country", &self.country, 60)?,
            phone: optional_text("phone", self.phone.as_deref(), 30)?,
        })
    }
}

/// Human-facing order reference: `PM-YYYYMMDD-XXXXXXXX`.
pub fn order_number(id: Uuid, placed_at: DateTime<Utc>) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("PM-{}-{}", placed_at.format("%Y%m%d"), &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn happy_path_transitions() {
        let s = OrderStatus::Pending;
        let s = s.transition(OrderStatus::Processing).unwrap();
        let s = s.transition(OrderStatus::Shipped).unwrap();
        let s = s.transition(OrderStatus::Delivered).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn cannot_cancel_after_shipping() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Processing.is_cancellable());
        let err = OrderStatus::Shipped
            .transition(OrderStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err.from, "SHIPPED");
        assert_eq!(err.to, "CANCELLED");
    }

    #[test]
    fn no_skipping_or_reversing() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn address_normalization() {
        let addr = ShippingAddress {
            full_name: "  Ada Lovelace ".into(),
            line1: "1 Bark Street".into(),
            line2: Some("   ".into()),
            city: "London".into(),
            region: None,
            postal_code: "N1 9GU".into(),
            country: "UK".into(),
            phone: None,
        };
        let n = addr.normalized().unwrap();
        assert_eq!(n.full_name, "Ada Lovelace");
        assert_eq!(n.line2, None);

        let bad = ShippingAddress {
            city: " ".into(),
            ..addr
        };
        assert_eq!(bad.normalized(), Err(ValidationError::EmptyField("city")));
    }

    #[test]
    fn order_number_format() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 0, 0).unwrap();
        assert_eq!(order_number(id, at), "PM-20260309-A1B2C3D4");
    }
}
