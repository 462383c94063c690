//! Mail API client configuration.
//!
//! Defaults target the hosted transactional-email service. Override via
//! environment variables or explicit construction for staging/testing.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for the transactional-email API.
///
/// Custom `Debug` implementation redacts the `api_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct MailConfig {
    /// Base URL of the email API. Default: <https://api.resend.com>
    pub api_url: Url,
    /// Bearer key for the email API. Zeroed on drop.
    pub api_key: Zeroizing<String>,
    /// Sender shown to recipients, e.g. `PawMart <hello@pawmart.example>`.
    pub from: String,
    /// Optional reply-to address for customer replies.
    pub reply_to: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("reply_to", &self.reply_to)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MailConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MAIL_API_URL` (default: `https://api.resend.com`)
    /// - `MAIL_API_KEY` (required)
    /// - `MAIL_FROM` (default: `PawMart <hello@pawmart.example>`)
    /// - `MAIL_REPLY_TO` (optional)
    /// - `MAIL_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("MAIL_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_url: env_url("MAIL_API_URL", "https://api.resend.com")?,
            api_key: Zeroizing::new(api_key),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "PawMart <hello@pawmart.example>".to_string()),
            reply_to: std::env::var("MAIL_REPLY_TO").ok(),
            timeout_secs: env_secs("MAIL_TIMEOUT_SECS", 10)?,
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    pub fn local_mock(base_url: &str, key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: Url::parse(base_url)
                .map(as_directory)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            api_key: Zeroizing::new(key.to_string()),
            from: "PawMart <test@pawmart.example>".to_string(),
            reply_to: None,
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw)
        .map(as_directory)
        .map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_secs(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidNumber(var.to_string(), raw)),
        },
        _ => Ok(default),
    }
}

/// Ensure the path ends in `/` so relative joins append to it.
pub(crate) fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MAIL_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0} must be a positive whole number of seconds, got {1:?}")]
    InvalidNumber(String, String),
}
