//! # pawmart-api — Axum API Service for the PawMart Storefront
//!
//! HTTP surface for a pet adoption and pet supplies shop: a product
//! catalog with cart, wishlist and checkout, adoptable pet listings with
//! visit reservations, content pages, and an admin back office.
//!
//! ## API Surface
//!
//! | Prefix                    | Module                        | Access     |
//! |---------------------------|-------------------------------|------------|
//! | `/v1/auth/*`              | [`routes::accounts`]          | public / session |
//! | `/v1/products/*`          | [`routes::products`]          | public     |
//! | `/v1/pets/*`              | [`routes::pets`]              | public     |
//! | `/v1/gallery`, `/v1/team` | [`routes::gallery`], [`routes::team`] | public |
//! | `/v1/cart/*`              | [`routes::cart`]              | session    |
//! | `/v1/wishlist/*`          | [`routes::wishlist`]          | session    |
//! | `/v1/checkout/*`          | [`routes::checkout`]          | session    |
//! | `/v1/orders/*`            | [`routes::orders`]            | session    |
//! | `/v1/reservations/*`      | [`routes::reservations`]      | session    |
//! | `/v1/admin/*`             | [`routes::admin`] and resource modules | admin |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! Public routes skip the auth step. Request bodies are capped at 1 MiB.
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside every middleware so
/// they stay cheap and always reachable.
pub fn app(state: AppState) -> Router {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: state.config.rate_limit_per_minute,
        window_secs: 60,
    });

    // Storefront routes open to anonymous visitors.
    let public = Router::new()
        .merge(routes::accounts::public_router())
        .merge(routes::products::router())
        .merge(routes::pets::router())
        .merge(routes::gallery::router())
        .merge(routes::team::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware));

    // Routes that need a session or the admin token.
    let authenticated = Router::new()
        .merge(routes::accounts::router())
        .merge(routes::cart::router())
        .merge(routes::wishlist::router())
        .merge(routes::checkout::router())
        .merge(routes::orders::router())
        .merge(routes::reservations::router())
        // Back office; handlers check the admin role.
        .merge(routes::admin::router())
        .merge(routes::products::admin_router())
        .merge(routes::pets::admin_router())
        .merge(routes::gallery::admin_router())
        .merge(routes::team::admin_router())
        .merge(routes::orders::admin_router())
        .merge(routes::reservations::admin_router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    let api = public
        .merge(authenticated)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(state.metrics.clone()))
        .layer(axum::Extension(limiter))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api).with_state(state)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 when the database (if configured) answers.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    if let Some(pool) = &state.db_pool {
        db::ping(pool)
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("database ping failed: {e}")))?;
    }
    Ok("ready")
}
