//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx. Optional: when `DATABASE_URL` is set,
//! every collection is written through to the `documents` table as JSONB;
//! when absent the API runs in in-memory-only mode (development, tests).
//!
//! - [`documents`] — generic upsert/delete/load over `(collection, id)`.
//! - [`products`] — the conditional stock updates used by checkout and
//!   order cancellation.

pub mod documents;
pub mod products;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    connect(&url).await.map(Some)
}

/// Connect to the given URL and apply embedded migrations.
pub async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Cheap connectivity check for the readiness probe.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// A pool whose every acquire fails fast, for exercising persist errors.
#[cfg(test)]
pub(crate) fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(250))
        .connect_lazy("postgres://pawmart@127.0.0.1:1/pawmart")
        .unwrap()
}
