//! # pawmart-cli — Operator CLI for the PawMart Storefront
//!
//! Provides the `pawmart` command-line interface for tasks that happen
//! outside the HTTP surface.
//!
//! ## Subcommands
//!
//! - `pawmart seed <catalog.yaml>` — Upsert products, pets and team
//!   members from a YAML catalog into the database.
//! - `pawmart quote <catalog.yaml> <cart.yaml>` — Price a cart against a
//!   catalog offline, with the same rules checkout uses.
//! - `pawmart create-admin --email <email> --name <name>` — Create or
//!   promote an admin account. The password is read from
//!   `PAWMART_ADMIN_PASSWORD`.
//!
//! ```bash
//! pawmart seed fixtures/catalog.yaml --dry-run
//! pawmart quote fixtures/catalog.yaml fixtures/cart.yaml --json
//! PAWMART_ADMIN_PASSWORD=... pawmart create-admin --email ops@pawmart.example --name Ops
//! ```

pub mod admin;
pub mod catalog;
pub mod quote;

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use sqlx::PgPool;

/// Read and parse a YAML file.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Connect to the database named by `DATABASE_URL` and apply migrations.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => bail!("DATABASE_URL must be set for this command"),
    };
    pawmart_api::db::connect(&url)
        .await
        .context("failed to connect to the database")
}

/// Single-threaded runtime for commands that talk to the database.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
