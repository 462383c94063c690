//! # Create-Admin Subcommand
//!
//! Bootstraps a back-office account. An existing account with the same
//! email is promoted and its password replaced.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use pawmart_api::auth::{self, Role};
use pawmart_api::state::UserRecord;
use pawmart_core::fields::{normalize_email, require_text};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Environment variable holding the new admin password.
pub const PASSWORD_ENV: &str = "PAWMART_ADMIN_PASSWORD";

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Arguments for the `pawmart create-admin` subcommand.
#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    /// Account email.
    #[arg(long)]
    pub email: String,

    /// Display name.
    #[arg(long)]
    pub name: String,
}

/// Check password length in characters.
pub fn check_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        bail!("password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters");
    }
    Ok(())
}

/// Build the admin record, reusing an existing account when present.
pub fn build_admin(
    existing: Option<UserRecord>,
    email: String,
    name: String,
    password_hash: String,
    now: DateTime<Utc>,
) -> UserRecord {
    match existing {
        Some(mut user) => {
            user.role = Role::Admin;
            user.name = name;
            user.password_hash = password_hash;
            user.updated_at = now;
            user
        }
        None => UserRecord {
            id: Uuid::new_v4(),
            email,
            name,
            phone: None,
            role: Role::Admin,
            password_hash,
            created_at: now,
            updated_at: now,
        },
    }
}

/// Execute the create-admin subcommand.
pub fn run_create_admin(args: &CreateAdminArgs) -> Result<u8> {
    let email = normalize_email(&args.email)?;
    let name = require_text("name", &args.name, 120)?;
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) => Zeroizing::new(p),
        Err(_) => bail!("{PASSWORD_ENV} must be set"),
    };
    check_password(&password)?;
    let password_hash = auth::hash_password(&password);

    crate::runtime()?.block_on(write_admin(email, name, password_hash))
}

async fn write_admin(email: String, name: String, password_hash: String) -> Result<u8> {
    use pawmart_api::db::documents;

    let pool = crate::connect_from_env().await?;
    let existing = documents::load_all::<UserRecord>(&pool)
        .await?
        .into_iter()
        .find(|u| u.email == email);
    let promoted = existing.is_some();
    let user = build_admin(existing, email, name, password_hash, Utc::now());
    documents::upsert(&pool, &user).await?;

    tracing::info!(user_id = %user.id, promoted, "admin account written");
    if promoted {
        println!("promoted {} ({}) to admin", user.email, user.id);
    } else {
        println!("created admin {} ({})", user.email, user.id);
    }
    Ok(0)
}
