//! # API Route Modules
//!
//! - `accounts` — registration, login, logout, current account.
//! - `products` — storefront catalog; admin product CRUD and stock.
//! - `pets` — adoptable pet listings; admin pet CRUD.
//! - `gallery` / `team` — public content pages and their admin CRUD.
//! - `cart` / `wishlist` — per-account shopping state.
//! - `checkout` — revalidation, pricing, stock deduction, order creation.
//! - `orders` — own order history and cancellation; admin status lifecycle.
//! - `reservations` — pet visit booking; admin confirmation lifecycle.
//! - `admin` — dashboard and account roles.
//!
//! Each module exposes `router()` for the routes it serves to the public or
//! to signed-in callers, and `admin_router()` where it has back-office routes.

pub mod accounts;
pub mod admin;
pub mod cart;
pub mod checkout;
pub mod gallery;
pub mod orders;
pub mod pets;
pub mod products;
pub mod reservations;
pub mod team;
pub mod wishlist;
