//! Append-only JSONL lead log
//!
//! One compact JSON object per line, never rewritten. The append is the only
//! non-idempotent side effect in the pipeline: after a crash the log may hold
//! a single duplicate trailing record, and consumers needing exactness must
//! deduplicate by `user_id`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::LeadRecord;

/// Lead log errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only writer for lead records.
pub struct LeadLog {
    path: PathBuf,
}

impl LeadLog {
    /// Create a log writer for `path`; the file is created on first append.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line.
    pub fn append(&self, record: &LeadRecord) -> Result<(), OutputError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
