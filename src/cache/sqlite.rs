//! SQLite-backed reviewer cache
//!
//! - Fast point lookups by user id
//! - Incremental writes (no rewriting a huge JSON document per save)
//! - Safe for long-running jobs: WAL mode, one transaction per batch

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::cache::{CacheResult, UserCache};
use crate::CachedUser;

/// Pragmas applied at open. WAL keeps readers unblocked during batch commits;
/// NORMAL sync is durable enough for a cache that can be rebuilt from the API.
const OPEN_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
";

const CREATE_USERS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS users (
  user_id INTEGER PRIMARY KEY,
  payload_json TEXT NOT NULL
)
";

/// Persistent reviewer cache backed by SQLite.
pub struct SqliteUserCache {
    conn: Connection,
    pending: Vec<(i64, CachedUser)>,
}

impl SqliteUserCache {
    /// Open (creating if needed) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(OPEN_PRAGMAS)?;
        conn.execute(CREATE_USERS_TABLE, [])?;

        debug!(path = %path.display(), "opened user cache");
        Ok(Self {
            conn,
            pending: Vec::new(),
        })
    }

    /// Number of committed entries.
    pub fn len(&self) -> CacheResult<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether the committed cache is empty.
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl UserCache for SqliteUserCache {
    fn get(&self, user_id: i64) -> CacheResult<Option<CachedUser>> {
        // Staged rows win over committed ones; latest stage wins over earlier.
        if let Some((_, user)) = self.pending.iter().rev().find(|(id, _)| *id == user_id) {
            return Ok(Some(user.clone()));
        }

        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload_json FROM users WHERE user_id = ?1 LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                // An unreadable row reads back as absent so the record is
                // simply re-fetched, instead of failing the whole run.
                warn!(user_id, error = %e, "discarding unreadable cache row");
                Ok(None)
            }
        }
    }

    fn set(&mut self, user_id: i64, user: CachedUser) {
        self.pending.push((user_id, user));
    }

    fn set_many(&mut self, rows: Vec<(i64, CachedUser)>) {
        self.pending.extend(rows);
    }

    fn commit(&mut self) -> CacheResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let rows = std::mem::take(&mut self.pending);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO users (user_id, payload_json) VALUES (?1, ?2)",
            )?;
            for (user_id, user) in &rows {
                stmt.execute(params![user_id, serde_json::to_string(user)?])?;
            }
        }
        tx.commit()?;

        debug!(rows = rows.len(), "committed cache batch");
        Ok(())
    }
}
