//! # Middleware
//!
//! Request counters and per-client rate limiting. Tracing comes from
//! `tower_http::trace::TraceLayer`; authentication lives in [`crate::auth`].

pub mod metrics;
pub mod rate_limit;
