#![deny(missing_docs)]

//! # pawmart-core — Domain Types for the PawMart Storefront
//!
//! Everything in this crate is synchronous and storage-agnostic. The API
//! crate owns persistence and HTTP; this crate owns the rules.
//!
//! ## Modules
//!
//! - [`money`] — integer minor-unit amounts. Floats never touch a price.
//! - [`catalog`] — product categories, species, pet attributes, slugs.
//! - [`cart`] — cart line arithmetic (merge, cap, remove).
//! - [`pricing`] — the checkout pipeline: stock re-validation against
//!   authoritative product state, subtotal/shipping/tax, stock deductions.
//! - [`order`] — order lifecycle, shipping address, order numbers.
//! - [`reservation`] — pet visit slots and reservation lifecycle.
//! - [`fields`] — shared text/email validation helpers.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod fields;
pub mod money;
pub mod order;
pub mod pricing;
pub mod reservation;

pub use cart::{Cart, CartLine, MAX_CART_LINES, MAX_LINE_QUANTITY};
pub use catalog::{AdoptionStatus, PetSex, PetSize, ProductCategory, Species};
pub use error::{CartError, TransitionError, ValidationError};
pub use money::Money;
pub use order::{OrderStatus, PaymentMethod, ShippingAddress};
pub use pricing::{
    PricedLine, PricingPolicy, Quote, StockDeduction, StockIssue, StockSnapshot,
};
pub use reservation::ReservationStatus;
