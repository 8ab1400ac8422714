//! Legacy single-document JSON cache and its migration to SQLite
//!
//! The JSON form stores every entry in one document `{"<id>": {..}, ..}` and
//! pays a full rewrite on every commit. It is kept for compatibility with
//! caches produced by earlier versions; new runs use [`SqliteUserCache`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheResult, SqliteUserCache, UserCache};
use crate::CachedUser;

/// Rows moved per transaction during migration.
const MIGRATION_BATCH: usize = 1_000;

/// Reviewer cache stored as a single JSON document.
pub struct JsonUserCache {
    path: PathBuf,
    data: BTreeMap<i64, CachedUser>,
}

impl JsonUserCache {
    /// Open the cache, loading the existing document if present.
    ///
    /// A missing or unreadable document loads as empty rather than failing;
    /// the cache is rebuildable from the API.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let data = load_document(&path);
        Self { path, data }
    }

    /// Number of entries currently held (staged writes included).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl UserCache for JsonUserCache {
    fn get(&self, user_id: i64) -> CacheResult<Option<CachedUser>> {
        Ok(self.data.get(&user_id).cloned())
    }

    fn set(&mut self, user_id: i64, user: CachedUser) {
        self.data.insert(user_id, user);
    }

    fn set_many(&mut self, rows: Vec<(i64, CachedUser)>) {
        self.data.extend(rows);
    }

    fn commit(&mut self) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let keyed: BTreeMap<String, &CachedUser> = self
            .data
            .iter()
            .map(|(id, user)| (id.to_string(), user))
            .collect();
        let json = serde_json::to_string_pretty(&keyed)?;

        // Write-temp-then-rename so a crash mid-commit never truncates the
        // previous document.
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Read and decode the document, tolerating absence and corruption.
fn load_document(path: &Path) -> BTreeMap<i64, CachedUser> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable JSON cache, starting empty");
            return BTreeMap::new();
        }
    };

    let doc: Value = match serde_json::from_str(&contents) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt JSON cache, starting empty");
            return BTreeMap::new();
        }
    };

    let mut data = BTreeMap::new();
    if let Some(entries) = doc.as_object() {
        for (key, value) in entries {
            let Ok(user_id) = key.parse::<i64>() else {
                continue;
            };
            if let Ok(user) = serde_json::from_value::<CachedUser>(value.clone()) {
                data.insert(user_id, user);
            }
        }
    }
    data
}

/// One-time migration of a legacy JSON cache document into the SQLite cache.
///
/// Preserves every entry except accounts flagged closed and entries with
/// non-integer keys or non-object values. Returns the number of migrated
/// records; a missing or unreadable source document migrates nothing.
pub fn migrate_json_cache_to_sqlite<P: AsRef<Path>, Q: AsRef<Path>>(
    json_path: P,
    sqlite_path: Q,
) -> CacheResult<usize> {
    let json_path = json_path.as_ref();
    let contents = match std::fs::read_to_string(json_path) {
        Ok(contents) => contents,
        Err(_) => return Ok(0),
    };
    let doc: Value = match serde_json::from_str(&contents) {
        Ok(doc) => doc,
        Err(_) => return Ok(0),
    };
    let Some(entries) = doc.as_object() else {
        return Ok(0);
    };

    let mut cache = SqliteUserCache::open(sqlite_path)?;
    let mut migrated = 0usize;
    let mut batch: Vec<(i64, CachedUser)> = Vec::new();

    for (key, value) in entries {
        let Ok(user_id) = key.parse::<i64>() else {
            continue;
        };
        if !value.is_object() {
            continue;
        }
        let Ok(user) = serde_json::from_value::<CachedUser>(value.clone()) else {
            continue;
        };
        // The closed-account policy applies during migration as well.
        if user.is_closed() {
            continue;
        }
        batch.push((user_id, user));
        if batch.len() >= MIGRATION_BATCH {
            migrated += batch.len();
            cache.set_many(std::mem::take(&mut batch));
            cache.commit()?;
        }
    }
    if !batch.is_empty() {
        migrated += batch.len();
        cache.set_many(batch);
        cache.commit()?;
    }

    if migrated > 0 {
        info!(
            migrated,
            source = %json_path.display(),
            "migrated legacy JSON cache to SQLite"
        );
    }
    Ok(migrated)
}
