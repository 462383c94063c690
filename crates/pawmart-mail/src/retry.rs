//! Retry with exponential backoff for email API calls.
//!
//! Only connection failures and timeouts are retried. Any response, 2xx or
//! not, is a definite answer from the provider and goes back to the caller.
//! Request-building errors fail on the first attempt.

use std::future::Future;
use std::time::Duration;

/// Backoff schedule: `base`, `2 * base`, `4 * base`, ... for `max_retries`
/// retries after the initial request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    pub max_retries: u32,
    pub base: Duration,
}

impl Default for Backoff {
    /// 200ms, 400ms, 800ms.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_millis(200),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Send a request to `endpoint`, retrying transient failures.
///
/// `f` is invoked at most `backoff.max_retries + 1` times.
pub(crate) async fn retry_send<F, Fut>(
    endpoint: &str,
    backoff: Backoff,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(resp) => {
                if attempt > 0 {
                    tracing::info!(endpoint, attempts = attempt + 1, "mail API reachable again");
                }
                return Ok(resp);
            }
            Err(e) if is_transient(&e) && attempt < backoff.max_retries => {
                let delay = backoff.delay(attempt);
                attempt += 1;
                tracing::warn!(
                    endpoint,
                    attempt,
                    max_retries = backoff.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "mail API unreachable, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
