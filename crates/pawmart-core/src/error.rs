//! # Error Types
//!
//! Structured errors for the domain layer, built with `thiserror`. The API
//! crate maps each of these to an HTTP status; nothing here knows about HTTP.

use thiserror::Error;
use uuid::Uuid;

/// Validation failures for domain values and request fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An amount string could not be parsed as a non-negative decimal with
    /// at most two fractional digits.
    #[error("invalid amount: \"{0}\" (expected a non-negative decimal like 12.99)")]
    InvalidAmount(String),

    /// Arithmetic on amounts overflowed.
    #[error("amount overflow")]
    AmountOverflow,

    /// A required text field was empty after trimming.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length in characters.
        max: usize,
    },

    /// An email address failed the basic shape check.
    #[error("invalid email address: \"{0}\"")]
    InvalidEmail(String),

    /// A numeric field fell outside its permitted range.
    #[error("{field} must be between {min} and {max}, got {actual}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
        /// The rejected value.
        actual: i64,
    },

    /// A timestamp was rejected (past, too far ahead, outside opening hours).
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Errors from cart line arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity must be at least one when adding.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The resulting line quantity would exceed the per-line cap.
    #[error("quantity {requested} for product {product_id} exceeds the maximum of {max}")]
    QuantityTooLarge {
        /// Product on the offending line.
        product_id: Uuid,
        /// Quantity the line would have after the operation.
        requested: u32,
        /// Per-line cap.
        max: u32,
    },

    /// The cart already holds the maximum number of distinct products.
    #[error("cart cannot hold more than {max} distinct products")]
    TooManyLines {
        /// Distinct-line cap.
        max: usize,
    },

    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    LineNotFound(Uuid),
}

/// A lifecycle transition that the state machine does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transition from {from} to {to}")]
pub struct TransitionError {
    /// Current state name.
    pub from: &'static str,
    /// Requested target state name.
    pub to: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::FieldTooLong {
            field: "name",
            max: 120,
        };
        assert_eq!(err.to_string(), "name must not exceed 120 characters");

        let err = ValidationError::OutOfRange {
            field: "party_size",
            min: 1,
            max: 6,
            actual: 9,
        };
        assert!(err.to_string().contains("party_size"));
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn transition_error_display() {
        let err = TransitionError {
            from: "DELIVERED",
            to: "PENDING",
        };
        assert_eq!(err.to_string(), "invalid transition from DELIVERED to PENDING");
    }
}
