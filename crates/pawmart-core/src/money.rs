//! # Money
//!
//! Amounts are held as integer minor units (cents). They are parsed from and
//! serialized to decimal strings so that no JSON float ever carries a price.
//!
//! ```
//! use pawmart_core::Money;
//!
//! let price: Money = "19.99".parse().unwrap();
//! assert_eq!(price.cents(), 1999);
//! assert_eq!(price.checked_mul(3).unwrap().to_string(), "59.97");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Basis points in one whole (100 %).
const BPS_PER_UNIT: u128 = 10_000;

/// A non-negative amount in minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// Build an amount from minor units.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in minor units.
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add two amounts, failing on overflow.
    pub fn checked_add(self, other: Money) -> Result<Money, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(ValidationError::AmountOverflow)
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// Multiply by a quantity, failing on overflow.
    pub fn checked_mul(self, quantity: u32) -> Result<Money, ValidationError> {
        self.0
            .checked_mul(u64::from(quantity))
            .map(Money)
            .ok_or(ValidationError::AmountOverflow)
    }

    /// Apply a rate expressed in basis points, rounding half up to the cent.
    ///
    /// `800` bps is 8 %.
    pub fn percent_bps(self, bps: u32) -> Money {
        let scaled = u128::from(self.0) * u128::from(bps) + BPS_PER_UNIT / 2;
        Money(u64::try_from(scaled / BPS_PER_UNIT).unwrap_or(u64::MAX))
    }

    /// Sum an iterator of amounts, failing on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Result<Money, ValidationError> {
        iter.into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidAmount(s.to_string());
        let trimmed = s.trim();

        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // "12." is not a valid amount.
        if trimmed.ends_with('.') {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac_cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Money)
            .ok_or(ValidationError::AmountOverflow)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Display output always parses back to the same amount.
        #[test]
        fn display_parses_back(cents in 0u64..=1_000_000_000_000) {
            let m = Money::from_cents(cents);
            let parsed: Money = m.to_string().parse().unwrap();
            prop_assert_eq!(parsed, m);
        }

        /// A percentage never exceeds the original amount for rates up to 100%.
        #[test]
        fn percent_is_bounded(cents in 0u64..=1_000_000_000, bps in 0u32..=10_000) {
            let m = Money::from_cents(cents);
            prop_assert!(m.percent_bps(bps) <= m);
        }
    }
}
