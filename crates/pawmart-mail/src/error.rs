//! Mail API client error types.

/// Errors from email API calls.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The email API returned a non-2xx status.
    #[error("mail API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The message has no recipients or an empty subject.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
