//! Remote upsert sink for resolved reviewer records
//!
//! The sink is an opaque collaborator injected into the pipeline at
//! construction; the pipeline never resolves one internally. Upserts are
//! keyed by id, so replaying a batch after a crash is safe.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub mod rest;

pub use rest::RestSink;

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The store rejected the upsert
    #[error("upsert failed with status {status}: {body}")]
    Upsert {
        /// Response status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Network-level failure reaching the store
    #[error("network error: {0}")]
    Network(String),

    /// The sink was configured with unusable values
    #[error("invalid sink configuration: {0}")]
    Configuration(String),
}

/// One row in the remote store's fixed column contract.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClientRow {
    /// Stable user id; upserts conflict on this column
    pub id: i64,
    /// Login name (never empty; falls back through the display names)
    pub username: String,
    /// Display name (never empty; falls back to username, then the id)
    pub display_name: String,
    /// Public-facing name (never empty; falls back to the display name)
    pub public_name: String,
    /// `{country, city}` object (empty fields are null)
    pub location: Value,
    /// Raw timezone object, `{}` when unknown
    pub timezone: Value,
    /// Naive-UTC timestamp `YYYY-MM-DD HH:MM:SS`
    pub joined_at: String,
    /// Raw status object, `{}` when unknown
    pub status: Value,
    /// Registration time (epoch seconds), only when cleanly derived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_at: Option<i64>,
}

/// Upsert target for reviewer rows.
#[async_trait]
pub trait UserSink: Send + Sync {
    /// Upsert `rows` by id. Must be idempotent: replaying a batch leaves the
    /// store unchanged.
    async fn upsert_users(&self, rows: &[ClientRow]) -> Result<(), SinkError>;
}

/// Sink used when no remote store is configured: warns once, then drops rows.
/// Reviewer records are still kept in the local cache.
#[derive(Default)]
pub struct DisabledSink {
    warned: AtomicBool,
}

impl DisabledSink {
    /// Create a disabled sink.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserSink for DisabledSink {
    async fn upsert_users(&self, rows: &[ClientRow]) -> Result<(), SinkError> {
        if !rows.is_empty() && !self.warned.swap(true, Ordering::Relaxed) {
            warn!("remote sink not configured; reviewer rows are only cached locally");
        }
        Ok(())
    }
}
