//! Retrying HTTP client
//!
//! Wraps every outbound call with rate limiting, retry with capped exponential
//! backoff on transient failures, and JSON decoding.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::backoff::{
    backoff_delay, DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_MAX_RETRIES,
};
use crate::client::rate_limit::RateLimiter;
use crate::client::{ApiError, ApiResult, Payload};

/// Status codes retried with backoff (rate limit and transient 5xx).
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Cap on stored response body snippets, to bound log and error sizes.
const BODY_SNIPPET_MAX: usize = 500;

/// HTTP behavior knobs.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,
    /// Initial exponential backoff delay
    pub backoff_base: Duration,
    /// Cap applied to computed backoff and to `Retry-After`
    pub backoff_max: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        }
    }
}

/// Most recent failure observed while retrying, reported on exhaustion.
enum LastFailure {
    Network(String),
    Status { status: u16, snippet: Option<String> },
}

/// Rate-limited, retrying HTTP client for the remote API.
///
/// Methods take `&mut self` because the rate limiter is single-task state;
/// the pipeline issues requests strictly sequentially.
pub struct ApiClient {
    http: reqwest::Client,
    api_root: String,
    auth_header: (HeaderName, HeaderValue),
    limiter: RateLimiter,
    config: HttpConfig,
}

impl ApiClient {
    /// Create a client rooted at `api_root`.
    ///
    /// `auth_header` is attached to every outbound request; producing it is
    /// the configuration layer's job and a missing credential never reaches
    /// this type.
    pub fn new(
        api_root: impl Into<String>,
        auth_header: (HeaderName, HeaderValue),
        limiter: RateLimiter,
        config: HttpConfig,
    ) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            auth_header,
            limiter,
            config,
        })
    }

    /// Issue a GET request and decode the response.
    ///
    /// `path` is joined onto the API root unless it is already absolute.
    /// Fails with a non-retryable error only for non-transient HTTP statuses;
    /// transient failures are retried `max_retries` times before escalating.
    pub async fn get(&mut self, path: &str, params: &[(String, String)]) -> ApiResult<Payload> {
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.api_root, path)
        };

        let attempts = self.config.max_retries + 1;
        let mut last_failure: Option<LastFailure> = None;

        for attempt in 0..attempts {
            self.limiter.wait().await;

            let (name, value) = &self.auth_header;
            let outcome = self
                .http
                .get(&url)
                .header(name.clone(), value.clone())
                .query(params)
                .send()
                .await;

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        attempts,
                        error = %e,
                        "network error"
                    );
                    last_failure = Some(LastFailure::Network(e.to_string()));
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                    continue;
                }
            };

            let status = response.status();

            if TRANSIENT_STATUSES.contains(&status.as_u16()) {
                let delay = self.retry_delay(response.headers(), attempt);
                let snippet = response.text().await.ok().map(|t| truncate(&t));
                warn!(
                    status = status.as_u16(),
                    attempt = attempt + 1,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure"
                );
                last_failure = Some(LastFailure::Status {
                    status: status.as_u16(),
                    snippet,
                });
                if attempt + 1 < attempts {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            if !status.is_success() {
                let body = truncate(&response.text().await.unwrap_or_default());
                return Err(ApiError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    // Body read failures are transport failures too.
                    warn!(attempt = attempt + 1, attempts, error = %e, "failed reading response body");
                    last_failure = Some(LastFailure::Network(e.to_string()));
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                    continue;
                }
            };

            return match serde_json::from_str::<Value>(&text) {
                Ok(doc) => {
                    debug!(url = %url, attempt = attempt + 1, "request succeeded");
                    Ok(Payload::Json(doc))
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "2xx response body is not JSON");
                    Ok(Payload::NonJson {
                        raw: truncate(&text),
                    })
                }
            };
        }

        Err(match last_failure {
            Some(LastFailure::Network(msg)) => ApiError::Network(msg),
            Some(LastFailure::Status { status, snippet }) => ApiError::RetriesExhausted {
                attempts,
                last_status: Some(status),
                body_snippet: snippet,
            },
            None => ApiError::RetriesExhausted {
                attempts,
                last_status: None,
                body_snippet: None,
            },
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self.config.backoff_base, self.config.backoff_max)
    }

    /// Sleep requested by the server via `Retry-After` (seconds, capped),
    /// falling back to exponential backoff when absent or unparseable.
    fn retry_delay(&self, headers: &HeaderMap, attempt: u32) -> Duration {
        if let Some(secs) = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite() && *s >= 0.0)
        {
            // Cap before constructing the Duration: from_secs_f64 panics on
            // finite values too large for a Duration, and the header is
            // server-controlled.
            return Duration::from_secs_f64(secs.min(self.config.backoff_max.as_secs_f64()));
        }
        self.backoff(attempt)
    }
}

/// Keep only a small prefix to avoid huge logs and error payloads.
fn truncate(text: &str) -> String {
    text.chars().take(BODY_SNIPPET_MAX).collect()
}
