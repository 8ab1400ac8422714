//! Durable pagination cursor
//!
//! The cursor is the sole recovery point after an interruption. It is written
//! atomically (write-temp-then-rename with fsyncs) and only after every side
//! effect of the position it describes has completed, so resuming reprocesses
//! at most one partially-completed entity and never skips one.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Pointer into the directory pagination: which page (`offset`) and which
/// position within that page (`index_in_page`) to process next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Directory offset of the current page
    pub offset: u64,
    /// Next entity index within the current page
    pub index_in_page: usize,
    /// Page size the offsets were computed with
    pub limit: u64,
}

impl Cursor {
    /// The cursor a fresh run starts from.
    pub fn initial(limit: u64) -> Self {
        Self {
            offset: 0,
            index_in_page: 0,
            limit,
        }
    }
}

/// On-disk document wrapping the cursor, matching the historical state layout.
#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    directory: Cursor,
}

/// Errors from persisting the cursor
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}

/// Loads and saves the cursor at a fixed path.
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    /// Create a store for the cursor document at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cursor document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted cursor.
    ///
    /// A missing, unreadable, or corrupt document falls back to the initial
    /// cursor with a warning: availability is preferred over strictness, at
    /// the cost of reprocessing already-covered entities (all downstream
    /// writes are idempotent upserts except the append-only log).
    pub fn load(&self, default_limit: u64) -> Cursor {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cursor file, starting from the beginning");
                return Cursor::initial(default_limit);
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable cursor file, starting from the beginning");
                return Cursor::initial(default_limit);
            }
        };

        match serde_json::from_str::<StateDocument>(&contents) {
            Ok(doc) => {
                debug!(
                    offset = doc.directory.offset,
                    index_in_page = doc.directory.index_in_page,
                    "loaded cursor"
                );
                doc.directory
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt cursor file, starting from the beginning");
                Cursor::initial(default_limit)
            }
        }
    }

    /// Persist the cursor atomically.
    ///
    /// Writes to a temp file in the target directory, flushes, fsyncs,
    /// renames over the target, and fsyncs the parent so the rename is
    /// durable. A lock file coordinates against a second collector pointed at
    /// the same state path.
    pub fn save(&self, cursor: &Cursor) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(&StateDocument { directory: *cursor })
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let lock_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StateError::Lock(format!("failed to create lock file: {e}")))?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| StateError::Lock(format!("failed to acquire write lock: {e}")))?;

        let parent_dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| StateError::Io(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StateError::Io(format!("failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StateError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StateError::Io(format!("failed to sync temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| StateError::Io(format!("failed to persist temp file: {e}")))?;

        // Fsync the parent directory so the rename survives a crash.
        if let Ok(dir) = std::fs::File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        debug!(
            offset = cursor.offset,
            index_in_page = cursor.index_in_page,
            "cursor saved"
        );
        Ok(())
    }
}
