//! Resilient HTTP GET with retry on server-side failures.
//!
//! Responses with status 500, 502, 503 or 504 are retried up to [`RetryPolicy::max_retries`]
//! times. The delay before retry `n` (0-based) is `delay_step * (n + 1)`, which with the
//! default two second step gives the 2s, 4s, 6s, ... schedule. Every other failure is
//! reported immediately.
//!
//! Failures are returned rather than logged, apart from a warning before each retry; callers
//! log them once.

use crate::Result;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use ohno::IntoAppError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

const LOG_TARGET: &str = "     fetch";

/// Maximum retry attempts (on top of the original request).
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Increment of the linear backoff between retries.
pub const DEFAULT_RETRY_DELAY_STEP: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay_step: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, delay_step: Duration) -> Self {
        Self { max_retries, delay_step }
    }

    /// Delay to wait before retry number `attempt` (0-based).
    #[must_use]
    pub const fn delay(&self, attempt: u32) -> Duration {
        self.delay_step.saturating_mul(attempt.saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_STEP)
    }
}

/// Why a fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server kept answering with a retryable 5xx status until retries ran out.
    #[error("HTTP {status} from '{url}' after {attempts} attempts")]
    Transient { url: String, status: u16, attempts: u32 },

    /// The server answered with a non-retryable failure status.
    #[error("HTTP {status} from '{url}'")]
    Permanent { url: String, status: u16 },

    /// The request could not be sent or the body could not be read.
    #[error("could not fetch '{url}'")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body was not the JSON document we expected.
    #[error("could not decode response from '{url}'")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl FetchError {
    pub(crate) fn invalid_url(url: &str, source: url::ParseError) -> Self {
        Self::InvalidUrl { url: url.to_string(), source }
    }

    /// Returns `true` if the failure came from exhausting retries on server errors.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Returns `true` for the server error statuses that are worth retrying.
#[must_use]
pub fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// HTTP client wrapper applying a [`RetryPolicy`] and counting the work it does.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    requests: AtomicU64,
    retries: AtomicU64,
}

impl Fetcher {
    pub fn new(user_agent: &str, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self {
            client,
            policy,
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        })
    }

    /// Number of HTTP requests sent so far, retries included.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Number of retries performed so far.
    #[must_use]
    pub fn retry_count(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// GET `url` and return its body as text.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        log::debug!(target: LOG_TARGET, "Fetching {url}");

        let mut attempt = 0;
        loop {
            let _ = self.requests.fetch_add(1, Ordering::Relaxed);

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(source) => {
                    log::debug!(target: LOG_TARGET, "Could not fetch {url}: {source:#}");
                    return Err(FetchError::Transport { url: url.to_string(), source });
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.text().await.map_err(|source| FetchError::Transport { url: url.to_string(), source });
            }

            if !is_retryable(status) {
                log::debug!(target: LOG_TARGET, "Fetch failed with HTTP {} for {url}", status.as_u16());
                return Err(FetchError::Permanent {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            if attempt >= self.policy.max_retries {
                return Err(FetchError::Transient {
                    url: url.to_string(),
                    status: status.as_u16(),
                    attempts: attempt + 1,
                });
            }

            let delay = self.policy.delay(attempt);
            log::warn!(
                target: LOG_TARGET,
                "HTTP {} for {url}, waiting {}ms before retry {} of {}",
                status.as_u16(),
                delay.as_millis(),
                attempt + 1,
                self.policy.max_retries,
            );
            tokio::time::sleep(delay).await;

            attempt += 1;
            let _ = self.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// GET `url` and decode its body as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.fetch(url).await?;
        decode_json(url, &body)
    }
}

/// Decode a JSON body fetched from `url`.
pub fn decode_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|source| {
        log::debug!(target: LOG_TARGET, "Could not decode response from {url}: {source:#}");
        FetchError::Decode { url: url.to_string(), source }
    })
}
