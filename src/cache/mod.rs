//! Persistent reviewer cache
//!
//! Two interchangeable backends: [`SqliteUserCache`] (indexed table,
//! incremental writes, the default) and [`JsonUserCache`] (legacy
//! single-document form, full rewrite per commit), plus a one-time migration
//! from the JSON form to SQLite.

use crate::CachedUser;

pub mod json;
pub mod sqlite;

pub use json::{migrate_json_cache_to_sqlite, JsonUserCache};
pub use sqlite::SqliteUserCache;

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// SQLite error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value store for normalized reviewer records, keyed by user id.
///
/// Writes are staged and made durable in batches: `set`/`set_many` buffer,
/// `commit` is the durability point. `get` observes staged rows so a caller
/// never reads stale data between a set and the commit.
pub trait UserCache {
    /// Look up a cached user. A key never written returns `None`.
    fn get(&self, user_id: i64) -> CacheResult<Option<CachedUser>>;

    /// Stage a single record.
    fn set(&mut self, user_id: i64, user: CachedUser);

    /// Stage a batch of records.
    fn set_many(&mut self, rows: Vec<(i64, CachedUser)>);

    /// Flush staged records durably. Staged rows replace existing entries
    /// with the same id (upsert semantics).
    fn commit(&mut self) -> CacheResult<()>;
}
