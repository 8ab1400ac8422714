//! PostgREST-style HTTP sink
//!
//! Upserts rows into a relational table over the store's REST interface:
//! `POST {base}/rest/v1/{table}?on_conflict=id` with merge-duplicates
//! resolution, authenticated by a service key.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::debug;

use crate::sink::{ClientRow, SinkError, UserSink};

/// Cap on stored error body snippets.
const BODY_SNIPPET_MAX: usize = 500;

/// HTTP sink targeting a PostgREST-compatible endpoint.
pub struct RestSink {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RestSink {
    /// Create a sink for `table` at `base_url`, authenticated by
    /// `service_key`.
    pub fn new(base_url: &str, table: &str, service_key: &str) -> Result<Self, SinkError> {
        if HeaderValue::from_str(service_key).is_err() {
            return Err(SinkError::Configuration(
                "service key is not a valid header value".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SinkError::Network(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: service_key.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl UserSink for RestSink {
    async fn upsert_users(&self, rows: &[ClientRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("on_conflict", "id")])
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("Prefer", "resolution=merge-duplicates")
            .json(rows)
            .send()
            .await
            .map_err(|e| SinkError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(BODY_SNIPPET_MAX)
                .collect();
            return Err(SinkError::Upsert {
                status: status.as_u16(),
                body,
            });
        }

        debug!(rows = rows.len(), "upserted reviewer rows");
        Ok(())
    }
}
