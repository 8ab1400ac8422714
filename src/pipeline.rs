//! Pipeline orchestration
//!
//! Drives the directory pagination, mines each listed user's reviews,
//! resolves reviewers through the cache and batched lookups, and emits one
//! lead record per user. Strictly sequential: one entity at a time, one page
//! at a time.
//!
//! The cursor is persisted only after every side effect for the entity it
//! points past has completed, so an interrupted run resumes without losing a
//! record and replays at most the entity that was in flight.

use serde_json::Value;
use tracing::{info, warn};

use crate::api::{self, directory, reviews, users};
use crate::cache::{CacheError, UserCache};
use crate::client::{ApiClient, ApiError};
use crate::normalize;
use crate::output::{LeadLog, OutputError};
use crate::sink::{SinkError, UserSink};
use crate::state::{Cursor, CursorStore, StateError};
use crate::LeadRecord;

/// Pipeline errors: any of these ends the run; the persisted cursor is the
/// recovery point for the next one.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Remote API failure (non-retryable, or retries exhausted)
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Reviewer cache failure
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Cursor persistence failure
    #[error(transparent)]
    State(#[from] StateError),

    /// Remote sink failure
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Lead log failure
    #[error(transparent)]
    Output(#[from] OutputError),

    /// A lead record violated its integrity invariants before the append
    #[error("invalid lead record: {0}")]
    InvalidRecord(String),
}

/// Knobs controlling pagination and batching.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory page size
    pub directory_limit: u64,
    /// Review fetch limit (single call per entity, no pagination)
    pub reviews_limit: u64,
    /// Reviewer ids per batched user lookup
    pub users_batch_size: usize,
    /// Directory search query
    pub query: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            directory_limit: 20,
            reviews_limit: 100,
            users_batch_size: 50,
            query: String::new(),
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Non-empty directory pages fetched
    pub pages: u64,
    /// Directory entities visited (including malformed, skipped ones)
    pub entities: u64,
    /// Lead records appended to the log
    pub leads: u64,
}

/// The collection orchestrator. Owns its collaborators; the sink is injected
/// at construction and never resolved internally.
pub struct Pipeline<C: UserCache> {
    client: ApiClient,
    cache: C,
    cursor_store: CursorStore,
    leads: LeadLog,
    sink: Box<dyn UserSink>,
    settings: PipelineSettings,
}

impl<C: UserCache> Pipeline<C> {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        client: ApiClient,
        cache: C,
        cursor_store: CursorStore,
        leads: LeadLog,
        sink: Box<dyn UserSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            cache,
            cursor_store,
            leads,
            sink,
            settings,
        }
    }

    /// Run until the directory is exhausted (an empty page) or a failure.
    ///
    /// Resumes from the persisted cursor: the stored `offset`/`index_in_page`
    /// are honored, the page size is the currently configured one.
    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let limit = self.settings.directory_limit;
        let resumed = self.cursor_store.load(limit);
        let mut offset = resumed.offset;
        let mut index_in_page = resumed.index_in_page;

        info!(offset, index_in_page, limit, "starting lead collection");
        let mut summary = RunSummary::default();

        loop {
            let page =
                directory::fetch_page(&mut self.client, limit, offset, &self.settings.query)
                    .await?;
            let entities = directory::extract_entities(&page).to_vec();
            if entities.is_empty() {
                info!(offset, "reached the last directory page");
                break;
            }
            summary.pages += 1;

            for (idx, entity) in entities.iter().enumerate() {
                if idx < index_in_page {
                    continue;
                }
                summary.entities += 1;

                let Some(user_id) = api::extract_user_id(entity) else {
                    // Still advance the cursor so a malformed entry can never
                    // stall the run.
                    warn!(offset, idx, "directory entry without a usable id, skipping");
                    self.persist_cursor(offset, idx + 1, limit)?;
                    continue;
                };

                self.process_entity(user_id, entity).await?;
                summary.leads += 1;
                self.persist_cursor(offset, idx + 1, limit)?;
            }

            offset += limit;
            index_in_page = 0;
            self.persist_cursor(offset, 0, limit)?;
        }

        info!(
            pages = summary.pages,
            entities = summary.entities,
            leads = summary.leads,
            "lead collection complete"
        );
        Ok(summary)
    }

    /// Steps 2-7 for one directory user: reviews, reviewer resolution, lead
    /// emission. The caller advances the cursor afterwards (step 8).
    async fn process_entity(&mut self, user_id: i64, entity: &Value) -> Result<(), PipelineError> {
        let reviews_payload =
            reviews::fetch_for_user(&mut self.client, user_id, self.settings.reviews_limit)
                .await?;
        let reviewer_ids: Vec<i64> = reviews::extract_reviewer_ids(&reviews_payload)
            .into_iter()
            .collect();

        let mut missing = Vec::new();
        for &reviewer_id in &reviewer_ids {
            if self.cache.get(reviewer_id)?.is_none() {
                missing.push(reviewer_id);
            }
        }
        for batch in missing.chunks(self.settings.users_batch_size.max(1)) {
            self.resolve_batch(batch).await?;
        }

        let mut reviewers = Vec::new();
        for &reviewer_id in &reviewer_ids {
            if let Some(user) = self.cache.get(reviewer_id)? {
                reviewers.push(user);
            }
        }

        let record = LeadRecord {
            user_id,
            reviewer_ids,
            reviewers,
        };
        record
            .validate()
            .map_err(PipelineError::InvalidRecord)?;
        self.leads.append(&record)?;

        let username = entity.get("username").and_then(Value::as_str).unwrap_or("");
        let public_name = entity
            .get("public_name")
            .and_then(Value::as_str)
            .unwrap_or("");
        info!(
            user_id,
            username,
            public_name,
            reviewers = record.reviewer_ids.len(),
            "lead recorded"
        );
        Ok(())
    }

    /// Fetch one batch of missing reviewers, upsert the open accounts to the
    /// sink, and commit them to the cache. Accounts flagged closed are
    /// persisted nowhere.
    async fn resolve_batch(&mut self, batch: &[i64]) -> Result<(), PipelineError> {
        let payload = users::fetch_by_ids(&mut self.client, batch).await?;
        let users_map = users::extract_users_map(&payload);

        let mut cache_rows = Vec::new();
        let mut sink_rows = Vec::new();
        for (&reviewer_id, user_obj) in &users_map {
            let minimized = normalize::minimize_user(user_obj);
            if minimized.is_closed() {
                continue;
            }
            sink_rows.push(normalize::to_client_row(reviewer_id, &minimized));
            cache_rows.push((reviewer_id, minimized));
        }

        // Sink first, cache commit second: if the upsert fails the batch is
        // re-fetched on the next run instead of being silently cache-only.
        self.sink.upsert_users(&sink_rows).await?;
        self.cache.set_many(cache_rows);
        self.cache.commit()?;
        Ok(())
    }

    fn persist_cursor(
        &self,
        offset: u64,
        index_in_page: usize,
        limit: u64,
    ) -> Result<(), StateError> {
        self.cursor_store.save(&Cursor {
            offset,
            index_in_page,
            limit,
        })
    }
}
