//! # Service Configuration
//!
//! Read once from the environment at startup. Unset variables fall back to
//! defaults; set-but-invalid variables fail startup with [`ConfigError`].
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | 8080 |
//! | `ADMIN_TOKEN` | unset (static admin bearer disabled) |
//! | `SESSION_TTL_HOURS` | 168 |
//! | `FREE_SHIPPING_THRESHOLD` | 50.00 |
//! | `FLAT_SHIPPING` | 5.99 |
//! | `TAX_RATE_BPS` | 800 |
//! | `LOW_STOCK_THRESHOLD` | 5 |
//! | `RATE_LIMIT_PER_MINUTE` | 600 |

use std::str::FromStr;

use pawmart_core::{Money, PricingPolicy};
use thiserror::Error;
use zeroize::Zeroizing;

/// A set-but-unusable environment variable.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{var}={value:?} is invalid: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Application configuration.
///
/// Custom `Debug` redacts the admin token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token accepted as an admin identity. `None` disables it.
    pub admin_token: Option<Zeroizing<String>>,
    /// Lifetime of a login session.
    pub session_ttl_hours: i64,
    /// Shipping and tax parameters for checkout.
    pub pricing: PricingPolicy,
    /// Products with stock below this show up on the dashboard.
    pub low_stock_threshold: u32,
    /// Requests per client per minute.
    pub rate_limit_per_minute: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("pricing", &self.pricing)
            .field("low_stock_threshold", &self.low_stock_threshold)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            admin_token: None,
            session_ttl_hours: 168,
            pricing: PricingPolicy::default(),
            low_stock_threshold: 5,
            rate_limit_per_minute: 600,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let session_ttl_hours: i64 =
            parse_var(&lookup, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError {
                var: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
                reason: "must be positive".into(),
            });
        }

        let tax_rate_bps: u32 =
            parse_var(&lookup, "TAX_RATE_BPS", defaults.pricing.tax_rate_bps)?;
        if tax_rate_bps > 10_000 {
            return Err(ConfigError {
                var: "TAX_RATE_BPS",
                value: tax_rate_bps.to_string(),
                reason: "must not exceed 10000 (100%)".into(),
            });
        }

        Ok(Self {
            port: parse_var(&lookup, "PORT", defaults.port)?,
            admin_token: lookup("ADMIN_TOKEN")
                .filter(|t| !t.trim().is_empty())
                .map(Zeroizing::new),
            session_ttl_hours,
            pricing: PricingPolicy {
                free_shipping_threshold: parse_var::<Money>(
                    &lookup,
                    "FREE_SHIPPING_THRESHOLD",
                    defaults.pricing.free_shipping_threshold,
                )?,
                flat_shipping: parse_var::<Money>(
                    &lookup,
                    "FLAT_SHIPPING",
                    defaults.pricing.flat_shipping,
                )?,
                tax_rate_bps,
            },
            low_stock_threshold: parse_var(
                &lookup,
                "LOW_STOCK_THRESHOLD",
                defaults.low_stock_threshold,
            )?,
            rate_limit_per_minute: parse_var(
                &lookup,
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            )?,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.admin_token.is_none());
        assert_eq!(config.pricing, PricingPolicy::default());
        assert_eq!(config.session_ttl_hours, 168);
    }

    #[test]
    fn reads_pricing_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FREE_SHIPPING_THRESHOLD", "75"),
            ("FLAT_SHIPPING", "4.50"),
            ("TAX_RATE_BPS", "725"),
            ("ADMIN_TOKEN", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(config.pricing.free_shipping_threshold, Money::from_cents(75_00));
        assert_eq!(config.pricing.flat_shipping, Money::from_cents(4_50));
        assert_eq!(config.pricing.tax_rate_bps, 725);
        assert_eq!(config.admin_token.as_deref().map(String::as_str), Some("s3cret"));
    }

    #[test]
    fn invalid_values_fail() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.var, "PORT");
        let err = AppConfig::from_lookup(lookup(&[("FLAT_SHIPPING", "-1")])).unwrap_err();
        assert_eq!(err.var, "FLAT_SHIPPING");
        let err = AppConfig::from_lookup(lookup(&[("TAX_RATE_BPS", "20000")])).unwrap_err();
        assert_eq!(err.var, "TAX_RATE_BPS");
        let err = AppConfig::from_lookup(lookup(&[("SESSION_TTL_HOURS", "0")])).unwrap_err();
        assert_eq!(err.var, "SESSION_TTL_HOURS");
    }

    #[test]
    fn debug_redacts_admin_token() {
        let config = AppConfig::from_lookup(lookup(&[("ADMIN_TOKEN", "s3cret")])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
