//! Log Tailer - incremental reads over live-appended Zeek logs
//!
//! Poll-based: each cycle reads whatever was appended since the last
//! line-aligned offset. Rotation and truncation are detected per poll by
//! comparing the file identity (inode) and size against the last known
//! cursor; either mismatch reopens the file from offset 0. A missing
//! file backs off for a bounded number of cycles instead of failing the
//! pipeline.

pub mod offsets;

pub use offsets::{FileCursor, OffsetStore};

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::logic::decoder::LogKind;

/// Polls skipped after a read failure, growing with consecutive failures.
const MAX_BACKOFF_POLLS: u32 = 5;

/// Result of polling one source.
#[derive(Debug, Default)]
pub struct TailBatch {
    pub lines: Vec<String>,
    /// File was reopened from offset 0 this poll
    pub rotated: bool,
}

/// One tailed log file.
pub struct TailedFile {
    path: PathBuf,
    kind: LogKind,
    /// Line-aligned committed offset
    offset: u64,
    identity: u64,
    /// Bytes after the last newline, waiting for the rest of the line
    partial: Vec<u8>,
    failures: u32,
    skip_polls: u32,
}

impl TailedFile {
    /// Open a source resuming from `cursor` when its identity still
    /// matches, otherwise (and by default at first sight) from the end
    /// of the file for pre-existing files or 0 for `from_start`.
    pub fn new(path: PathBuf, kind: LogKind, cursor: Option<FileCursor>, from_start: bool) -> Self {
        let current_identity = file_identity(&path).unwrap_or(0);
        let len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let (offset, identity) = match cursor {
            Some(c) if c.identity == current_identity && c.offset <= len => (c.offset, c.identity),
            Some(c) => {
                log::info!(
                    "Stale cursor for {:?} (offset {} vs len {}), restarting at 0",
                    path, c.offset, len
                );
                (0, current_identity)
            }
            None if from_start => (0, current_identity),
            None => (len, current_identity),
        };

        Self {
            path,
            kind,
            offset,
            identity,
            partial: Vec::new(),
            failures: 0,
            skip_polls: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> LogKind {
        self.kind
    }

    pub fn cursor(&self) -> FileCursor {
        FileCursor { offset: self.offset, identity: self.identity }
    }

    /// Reset the in-memory position to `cursor`, dropping any buffered
    /// partial line. The next poll re-reads everything past it, so lines
    /// read but not yet committed are re-emitted instead of lost.
    pub fn rewind(&mut self, cursor: FileCursor) {
        self.offset = cursor.offset;
        self.identity = cursor.identity;
        self.partial.clear();
    }

    /// Unread bytes still sitting in the file (per-source lag).
    pub fn lag(&self) -> u64 {
        fs::metadata(&self.path)
            .map(|m| m.len().saturating_sub(self.offset))
            .unwrap_or(0)
    }

    /// Read newly appended complete lines. A trailing partial line stays
    /// buffered and the committed offset never moves past a newline it
    /// has not seen.
    pub fn poll(&mut self) -> std::io::Result<TailBatch> {
        if self.skip_polls > 0 {
            self.skip_polls -= 1;
            return Ok(TailBatch::default());
        }

        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) => {
                self.note_failure();
                return Err(e);
            }
        };

        let mut batch = TailBatch::default();

        let current_identity = file_identity(&self.path).unwrap_or(0);
        let shrunk = meta.len() < self.offset;
        let replaced = self.identity != 0 && current_identity != 0 && current_identity != self.identity;
        if shrunk || replaced {
            log::info!(
                "Rotation detected on {:?} ({}), reopening from 0",
                self.path,
                if shrunk { "size shrank" } else { "identity changed" }
            );
            self.offset = 0;
            self.partial.clear();
            batch.rotated = true;
        }
        self.identity = current_identity;

        let read_pos = self.offset + self.partial.len() as u64;
        if meta.len() <= read_pos {
            self.failures = 0;
            return Ok(batch);
        }

        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                self.note_failure();
                return Err(e);
            }
        };
        file.seek(SeekFrom::Start(read_pos))?;
        let mut fresh = Vec::new();
        file.read_to_end(&mut fresh)?;
        self.failures = 0;

        let mut buf = std::mem::take(&mut self.partial);
        buf.extend_from_slice(&fresh);

        let mut consumed = 0usize;
        let mut start = 0usize;
        while let Some(nl) = buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + nl;
            let line = String::from_utf8_lossy(&buf[start..end]).into_owned();
            batch.lines.push(line);
            start = end + 1;
            consumed = start;
        }
        self.partial = buf[consumed..].to_vec();
        self.offset += consumed as u64;

        Ok(batch)
    }

    fn note_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.skip_polls = self.failures.min(MAX_BACKOFF_POLLS);
        if self.failures == 1 {
            log::warn!("Cannot read {:?}, backing off", self.path);
        }
    }
}

/// Tails every recognized log in a directory, plus any explicit files.
pub struct LogTailer {
    sources: Vec<TailedFile>,
    scan_dir: Option<PathBuf>,
}

impl LogTailer {
    pub fn new(scan_dir: Option<PathBuf>, files: Vec<PathBuf>, store: &OffsetStore) -> Self {
        let mut tailer = Self { sources: Vec::new(), scan_dir };
        for path in files {
            tailer.add_source(path, store, false);
        }
        tailer.refresh_sources(store, false);
        tailer
    }

    pub fn sources(&self) -> &[TailedFile] {
        &self.sources
    }

    /// Rescan the directory: new files start from 0 (they were just
    /// created by the monitor), vanished files are dropped. Returns the
    /// dropped paths so the caller can retire their persisted cursors.
    pub fn refresh_sources(&mut self, store: &OffsetStore, new_from_start: bool) -> Vec<PathBuf> {
        let Some(dir) = self.scan_dir.clone() else { return Vec::new() };
        let Ok(entries) = fs::read_dir(&dir) else { return Vec::new() };

        let mut seen: Vec<PathBuf> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |e| e != "log") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            if LogKind::from_stem(stem).is_none() {
                continue;
            }
            seen.push(path.clone());
            if !self.sources.iter().any(|s| s.path == path) {
                self.add_source(path, store, new_from_start);
            }
        }

        let mut dropped = Vec::new();
        self.sources.retain(|s| {
            let within_dir = s.path.parent() == Some(dir.as_path());
            let keep = !within_dir || seen.contains(&s.path);
            if !keep {
                log::info!("Log file {:?} disappeared, dropping source", s.path);
                dropped.push(s.path.clone());
            }
            keep
        });
        dropped
    }

    fn add_source(&mut self, path: PathBuf, store: &OffsetStore, from_start: bool) {
        let Some(kind) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(LogKind::from_stem)
        else {
            log::warn!("Unrecognized log file {:?}, skipping", path);
            return;
        };
        log::info!("Tailing {:?} as {} log", path, kind.as_str());
        let cursor = store.get(&path);
        self.sources.push(TailedFile::new(path, kind, cursor, from_start));
    }

    /// Poll every source, yielding (source index, batch) for non-empty
    /// results. Per-source failures degrade that source only.
    pub fn poll_all(&mut self) -> Vec<(usize, TailBatch)> {
        let mut out = Vec::new();
        for (i, source) in self.sources.iter_mut().enumerate() {
            match source.poll() {
                Ok(batch) if batch.lines.is_empty() && !batch.rotated => {}
                Ok(batch) => out.push((i, batch)),
                Err(e) => log::debug!("Poll failed for {:?}: {}", source.path, e),
            }
        }
        out
    }

    /// Record every source's cursor into the store (caller commits).
    pub fn checkpoint(&self, store: &mut OffsetStore) {
        for source in &self.sources {
            store.set(source.path.clone(), source.cursor());
        }
    }

    /// Current in-memory cursors, index-aligned with `sources`.
    pub fn cursors(&self) -> Vec<FileCursor> {
        self.sources.iter().map(|s| s.cursor()).collect()
    }

    /// Roll every source back to a previously captured cursor set.
    pub fn rewind(&mut self, cursors: &[FileCursor]) {
        for (source, cursor) in self.sources.iter_mut().zip(cursors) {
            source.rewind(*cursor);
        }
    }
}

#[cfg(unix)]
fn file_identity(path: &Path) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).ok().map(|m| m.ino())
}

#[cfg(not(unix))]
fn file_identity(path: &Path) -> Option<u64> {
    // No stable identity available; size-shrink detection still applies
    fs::metadata(path).ok().map(|_| 1)
}
