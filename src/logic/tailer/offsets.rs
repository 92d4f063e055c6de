//! Persisted read offsets
//!
//! An explicit recovery log, not ambient file-system state: after each
//! fully committed batch the pipeline writes every source's byte offset
//! and file identity to a JSON file, and a restart resumes from there.
//! Offsets are line-aligned, so the worst case across a crash is a brief
//! re-emission of the last uncommitted batch, never loss of the tail.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const OFFSETS_FILE: &str = "log_positions.json";

/// Position within one tailed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCursor {
    /// Byte offset of the first unread line
    pub offset: u64,
    /// File identity (inode on unix); 0 when unknown
    pub identity: u64,
}

pub struct OffsetStore {
    path: PathBuf,
    cursors: HashMap<PathBuf, FileCursor>,
}

impl OffsetStore {
    /// Load persisted cursors, starting empty when none exist or the
    /// file is unreadable (a stale store is worth less than a live tail).
    pub fn load(state_dir: &Path) -> Self {
        let path = state_dir.join(OFFSETS_FILE);
        let cursors = fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        let store = Self { path, cursors };
        if !store.cursors.is_empty() {
            log::info!("Loaded read offsets for {} files", store.cursors.len());
        }
        store
    }

    pub fn get(&self, file: &Path) -> Option<FileCursor> {
        self.cursors.get(file).copied()
    }

    pub fn set(&mut self, file: PathBuf, cursor: FileCursor) {
        self.cursors.insert(file, cursor);
    }

    pub fn remove(&mut self, file: &Path) {
        self.cursors.remove(file);
    }

    /// Persist all cursors. Called only after a fully committed batch.
    pub fn commit(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.cursors)?;
        // Write-then-rename keeps the store readable across a crash
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
