//! Rate-limited, retrying HTTP access to the remote API

use serde_json::Value;

pub mod backoff;
pub mod http;
pub mod rate_limit;

pub use http::{ApiClient, HttpConfig};
pub use rate_limit::{RateLimitConfig, RateLimiter};

/// Client errors (taxonomy: transient failures are retried internally and
/// only escalate here after exhausting retries)
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-retryable HTTP error (non-2xx outside the transient set)
    #[error("HTTP error {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Network-level failure (timeout, connection refused) after retries
    #[error("network error: {0}")]
    Network(String),

    /// Transient failures persisted through every attempt
    #[error("request failed after {attempts} attempts (last_status={last_status:?}, last_body={body_snippet:?})")]
    RetriesExhausted {
        /// Total attempts made (`max_retries + 1`)
        attempts: u32,
        /// Status of the last transient response, if any was received
        last_status: Option<u16>,
        /// Truncated body of the last transient response
        body_snippet: Option<String>,
    },
}

/// Result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Decoded body of a successful (2xx) response.
///
/// A 2xx response whose body fails JSON parsing is surfaced as an explicit
/// [`Payload::NonJson`] degraded result instead of an error, so a single
/// malformed response cannot abort a long-running collection. Envelope
/// extractors treat it as an empty envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON document
    Json(Value),
    /// 2xx body that was not valid JSON
    NonJson {
        /// Raw body text, truncated
        raw: String,
    },
}

impl Payload {
    /// The parsed document, or `None` for the degraded non-JSON case.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::NonJson { .. } => None,
        }
    }
}
