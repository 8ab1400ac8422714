//! `run` and `migrate-cache` commands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::cache::{migrate_json_cache_to_sqlite, SqliteUserCache};
use crate::cli::CliError;
use crate::client::{ApiClient, RateLimiter};
use crate::config::Settings;
use crate::output::LeadLog;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::sink::{DisabledSink, RestSink, UserSink};
use crate::state::CursorStore;

/// Resumable lead collector for the marketplace user directory
#[derive(Parser)]
#[command(name = "lead-collector", version, about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the collection pipeline until the directory is exhausted
    Run(RunArgs),
    /// Migrate a legacy JSON cache document into a SQLite cache
    MigrateCache(MigrateCacheArgs),
}

/// Arguments for the `run` command. Every flag overrides the corresponding
/// environment-derived setting.
#[derive(Parser)]
pub struct RunArgs {
    /// Cursor state file path
    #[arg(long)]
    pub state_path: Option<PathBuf>,

    /// Lead log (JSONL) path
    #[arg(long)]
    pub leads_path: Option<PathBuf>,

    /// Reviewer cache database path
    #[arg(long)]
    pub cache_path: Option<PathBuf>,

    /// Directory page size
    #[arg(long)]
    pub directory_limit: Option<u64>,

    /// Review fetch limit per directory user
    #[arg(long)]
    pub reviews_limit: Option<u64>,

    /// Reviewer ids per batched lookup
    #[arg(long)]
    pub users_batch_size: Option<usize>,

    /// Directory search query
    #[arg(long)]
    pub query: Option<String>,
}

impl RunArgs {
    /// Execute the collection run.
    pub async fn execute(self) -> Result<(), CliError> {
        let mut settings = Settings::from_env()?;
        if let Some(path) = self.state_path {
            settings.state_path = path;
        }
        if let Some(path) = self.leads_path {
            settings.leads_path = path;
        }
        if let Some(path) = self.cache_path {
            settings.cache_path = path;
        }
        if let Some(limit) = self.directory_limit {
            settings.directory_limit = limit;
        }
        if let Some(limit) = self.reviews_limit {
            settings.reviews_limit = limit;
        }
        if let Some(size) = self.users_batch_size {
            settings.users_batch_size = size;
        }
        if let Some(query) = self.query {
            settings.query = query;
        }

        let auth_header = settings.auth_header()?;

        // One-time pickup of a cache document left by an earlier version:
        // alongside a fresh SQLite path, a sibling .json document is migrated
        // in before the run.
        if settings.cache_path.extension().is_some_and(|e| e == "db") {
            let legacy = settings.cache_path.with_extension("json");
            if legacy.exists() && !settings.cache_path.exists() {
                let migrated = migrate_json_cache_to_sqlite(&legacy, &settings.cache_path)?;
                info!(migrated, "picked up legacy JSON cache");
            }
        }

        let limiter = RateLimiter::new(settings.rate_limit.clone());
        let client = ApiClient::new(
            settings.api_root.clone(),
            auth_header,
            limiter,
            settings.http.clone(),
        )?;
        let cache = SqliteUserCache::open(&settings.cache_path)?;
        let cursor_store = CursorStore::new(&settings.state_path);
        let leads = LeadLog::new(&settings.leads_path);

        let sink: Box<dyn UserSink> = match &settings.sink {
            Some(sink) => {
                info!(url = %sink.url, table = %sink.table, "remote sink enabled");
                Box::new(RestSink::new(&sink.url, &sink.table, &sink.service_key)?)
            }
            None => Box::new(DisabledSink::new()),
        };

        let mut pipeline = Pipeline::new(
            client,
            cache,
            cursor_store,
            leads,
            sink,
            PipelineSettings {
                directory_limit: settings.directory_limit,
                reviews_limit: settings.reviews_limit,
                users_batch_size: settings.users_batch_size,
                query: settings.query.clone(),
            },
        );

        let summary = pipeline.run().await?;
        info!(
            pages = summary.pages,
            entities = summary.entities,
            leads = summary.leads,
            "run finished"
        );
        Ok(())
    }
}

/// Arguments for the `migrate-cache` command.
#[derive(Parser)]
pub struct MigrateCacheArgs {
    /// Legacy JSON cache document to read
    #[arg(long)]
    pub json_path: PathBuf,

    /// SQLite cache database to write
    #[arg(long)]
    pub sqlite_path: PathBuf,
}

impl MigrateCacheArgs {
    /// Execute the migration.
    pub async fn execute(self) -> Result<(), CliError> {
        let migrated = migrate_json_cache_to_sqlite(&self.json_path, &self.sqlite_path)?;
        info!(
            migrated,
            source = %self.json_path.display(),
            target = %self.sqlite_path.display(),
            "cache migration complete"
        );
        Ok(())
    }
}
