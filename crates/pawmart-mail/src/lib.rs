//! # pawmart-mail -- Typed client for the transactional-email API
//!
//! The storefront sends four kinds of mail: welcome, order confirmation,
//! order status updates, and reservation notices. Message bodies are built
//! by [`templates`]; delivery goes through [`MailClient::send`].
//!
//! ## Wire format
//!
//! `POST {api_url}/emails` with a bearer key and a JSON body. A path on
//! `api_url` is kept, so `https://mail.example/v2` posts to `/v2/emails`.
//!
//! ```text
//! { "from": "...", "to": ["..."], "subject": "...", "html": "...",
//!   "text": "...", "reply_to": "..." }
//! ```
//!
//! A 2xx response carries `{ "id": "<provider message id>" }`.

pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod templates;

pub use config::MailConfig;
pub use error::MailError;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Client for the transactional-email API.
#[derive(Debug, Clone)]
pub struct MailClient {
    http: reqwest::Client,
    base_url: url::Url,
    from: String,
    reply_to: Option<String>,
    backoff: retry::Backoff,
}

impl MailClient {
    /// Create a new client from configuration.
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!(
                        "Bearer {}",
                        config.api_key.as_str()
                    ))
                    .map_err(|_| MailError::Config(config::ConfigError::MissingApiKey))?,
                );
                headers
            })
            .build()
            .map_err(|e| MailError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config::as_directory(config.api_url),
            from: config.from,
            reply_to: config.reply_to,
            backoff: retry::Backoff::default(),
        })
    }

    /// The configured sender.
    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Send a message.
    ///
    /// Calls `POST {api_url}/emails`.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, MailError> {
        let endpoint = "POST /emails";

        if email.to.is_empty() {
            return Err(MailError::InvalidMessage("no recipients".into()));
        }
        if email.subject.trim().is_empty() {
            return Err(MailError::InvalidMessage("empty subject".into()));
        }

        let url = self.base_url.join("emails").map_err(|e| {
            MailError::Config(config::ConfigError::InvalidUrl(
                self.base_url.to_string(),
                e.to_string(),
            ))
        })?;

        let body = SendEmailRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
            reply_to: self.reply_to.as_deref(),
        };

        let resp = retry::retry_send(endpoint, self.backoff, || {
            self.http.post(url.clone()).json(&body).send()
        })
        .await
            .map_err(|e| MailError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let sent: SentEmail = resp.json().await.map_err(|e| MailError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })?;

        tracing::debug!(message_id = %sent.id, recipients = email.to.len(), "email accepted");
        Ok(sent)
    }
}
