//! Sweep checkpoint for resumable runs.
//!
//! The checkpoint records the first page whose points are not yet known to
//! be flushed. It is rewritten atomically (temp file + rename) whenever that
//! page advances, so a crashed sweep resumes without skipping data.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;

/// Persisted sweep position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepCheckpoint {
    /// Collection the sweep writes to
    pub collection: String,

    /// Page to start from when resuming
    pub next_page: u32,

    /// Pages whose fetch failed
    #[serde(default)]
    pub failed_pages: BTreeSet<u32>,

    /// Pages with points lost to a failed flush
    #[serde(default)]
    pub dropped_pages: BTreeSet<u32>,

    /// Points appended so far
    pub total_added: u64,

    /// Last write (milliseconds since epoch)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl SweepCheckpoint {
    pub fn new(collection: impl Into<String>, next_page: u32) -> Self {
        Self {
            collection: collection.into(),
            next_page,
            failed_pages: BTreeSet::new(),
            dropped_pages: BTreeSet::new(),
            total_added: 0,
            updated_at: Utc::now(),
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        serde_json::to_vec_pretty(self).map_err(PipelineError::from)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(bytes).map_err(PipelineError::from)
    }

    /// Read a checkpoint, `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, PipelineError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes).map(Some)
    }

    /// Write the checkpoint atomically, stamping `updated_at`.
    pub fn save(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.updated_at = Utc::now();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, self.to_bytes()?)?;
        std::fs::rename(&tmp, path)?;

        debug!(path = ?path, next_page = self.next_page, "Saved checkpoint");
        Ok(())
    }
}
