//! # Lead Collector Library
//!
//! A resumable pipeline that mines a marketplace directory for leads: it pages
//! through the user directory, fetches the reviews left for each listed user,
//! resolves the reviewers behind those reviews through a batched and cached
//! lookup, and writes one normalized lead record per directory user to a local
//! append-only log and a remote relational store.
//!
//! ## Features
//!
//! - **Resume Capability**: a durable pagination cursor is persisted after
//!   every processed user, so an interrupted run picks up where it stopped
//! - **Rate Limiting**: minimum inter-request interval, a sliding
//!   requests-per-minute window, and random jitter
//! - **Retry with Backoff**: transient HTTP failures (429/5xx/network) are
//!   retried with capped exponential backoff, honoring `Retry-After`
//! - **Incremental Caching**: reviewer records are cached in SQLite so a user
//!   is fetched from the remote API at most once across runs
//!
//! ## Architecture
//!
//! - [`client`] - rate limiter, backoff policy, and the retrying HTTP client
//! - [`api`] - endpoint wrappers and response-envelope decoding
//! - [`cache`] - persistent reviewer cache (SQLite and legacy JSON backends)
//! - [`state`] - durable pagination cursor with atomic persistence
//! - [`output`] - append-only JSONL lead log
//! - [`sink`] - remote upsert sink for resolved reviewer rows
//! - [`normalize`] - pure mapping from raw API payloads to stored records
//! - [`pipeline`] - the orchestrator driving all of the above
//!
//! ## Failure Model
//!
//! The pipeline is strictly sequential. All side effects for a directory user
//! (sink upserts, cache commits, log append) complete before the cursor is
//! advanced past that user, so a crash replays at most the one user that was
//! in flight. Cache and sink writes are id-keyed upserts and therefore safe to
//! replay; the lead log may contain a single duplicate trailing record after a
//! crash.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// Typed wrappers over the remote API endpoints
pub mod api;

/// Persistent reviewer cache backends
pub mod cache;

/// CLI command implementations
pub mod cli;

/// Rate-limited, retrying HTTP access
pub mod client;

/// Runtime configuration
pub mod config;

/// Raw payload normalization
pub mod normalize;

/// Append-only lead log
pub mod output;

/// Pipeline orchestration
pub mod pipeline;

/// Remote upsert sink
pub mod sink;

/// Durable pagination cursor
pub mod state;

/// Structured location stored with a cached user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserLocation {
    /// Country display name
    pub country: Option<String>,
    /// City display name
    pub city: Option<String>,
}

/// Normalized subset of a fetched user object, keyed by user id and persisted
/// across runs in the reviewer cache.
///
/// Every field is optional because the upstream API omits fields freely;
/// fields that would serialize as null are dropped to keep the stored JSON
/// compact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CachedUser {
    /// Login name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Account-closed flag; closed accounts are never cached or sinked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    /// Registration time (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<i64>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Country/city pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<UserLocation>,
    /// Raw status object from the API (kept whole, not just email_verified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    /// Public-facing name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_name: Option<String>,
    /// Raw timezone object from the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<serde_json::Value>,
    /// Whether registration was completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_completed: Option<bool>,
}

impl CachedUser {
    /// Whether the account is flagged as closed.
    pub fn is_closed(&self) -> bool {
        self.closed.unwrap_or(false)
    }
}

/// One lead record, emitted to the append-only log exactly once per
/// successfully processed directory user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeadRecord {
    /// Id of the directory user the reviews were left for
    pub user_id: i64,
    /// Deduplicated reviewer ids, sorted ascending
    pub reviewer_ids: Vec<i64>,
    /// Resolved reviewer details found in the cache; closed or unresolved
    /// reviewers keep their id in `reviewer_ids` but have no entry here
    pub reviewers: Vec<CachedUser>,
}

impl LeadRecord {
    /// Validate record integrity: reviewer ids must be strictly ascending
    /// (sorted and deduplicated) and resolved details can never outnumber ids.
    pub fn validate(&self) -> Result<(), String> {
        if !self.reviewer_ids.windows(2).all(|w| w[0] < w[1]) {
            return Err("reviewer_ids must be sorted ascending without duplicates".to_string());
        }
        if self.reviewers.len() > self.reviewer_ids.len() {
            return Err(format!(
                "resolved reviewers ({}) exceed reviewer ids ({})",
                self.reviewers.len(),
                self.reviewer_ids.len()
            ));
        }
        Ok(())
    }
}
