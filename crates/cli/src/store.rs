// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local durable event storage.
//!
//! Every entry is appended to two JSONL files:
//!
//! - the **archive** (`logs/{experiment}_{user}.jsonl`), an audit log that
//!   is never pruned and never read by sync;
//! - the **queue** (`queue/`), holding entries not yet confirmed by the
//!   remote store.
//!
//! Producers always append to the active queue file. Before draining, the
//! sync worker seals it (renames it to a `batch-*.jsonl` name under the
//! queue lock), so an upload never reads a file that is still growing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use aura_core::{jsonl, LogEntry};

use crate::config::archive_file_name;
use crate::error::Result;

/// Name of the queue file producers append to.
pub const ACTIVE_QUEUE_FILE: &str = "current_queue.jsonl";
/// Extension given to a fully uploaded file that could not be deleted.
pub const UPLOADED_EXTENSION: &str = "uploaded";

const ARCHIVE_DIR_NAME: &str = "logs";
const QUEUE_DIR_NAME: &str = "queue";

/// The directory of pending queue files.
///
/// Shared between the event store (appends) and the sync worker (seal,
/// list, delete). The lock serializes appends against sealing.
#[derive(Debug)]
pub struct QueueDir {
    dir: PathBuf,
    lock: Mutex<()>,
    seq: AtomicU64,
}

impl QueueDir {
    /// Create or open a queue directory.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(QueueDir {
            dir: dir.to_path_buf(),
            lock: Mutex::new(()),
            seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_QUEUE_FILE)
    }

    /// Append one serialized entry to the active queue file.
    pub fn append_line(&self, line: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        jsonl::append_line(&self.active_path(), line)?;
        Ok(())
    }

    /// Seal the active file into a batch file so producers move to a fresh one.
    ///
    /// Returns the batch path, or `None` when there was nothing to seal.
    pub fn seal(&self, now_ms: u64) -> Result<Option<PathBuf>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let active = self.active_path();

        let len = match fs::metadata(&active) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if len == 0 {
            return Ok(None);
        }

        let batch = loop {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let candidate = self.dir.join(format!("batch-{:013}-{:04}.jsonl", now_ms, seq));
            if !candidate.exists() {
                break candidate;
            }
        };
        fs::rename(&active, &batch)?;
        tracing::debug!(batch = %batch.display(), "sealed queue file");
        Ok(Some(batch))
    }

    /// Sealed queue files, oldest first by modification time.
    ///
    /// The active file is excluded; so are files already marked uploaded.
    pub fn sealed_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for dirent in fs::read_dir(&self.dir)? {
            let path = dirent?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            if path.file_name().is_some_and(|n| n == ACTIVE_QUEUE_FILE) {
                continue;
            }
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// All pending files, sealed first, then the active file if present.
    pub fn pending_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.sealed_files()?;
        let active = self.active_path();
        if active.is_file() {
            files.push(active);
        }
        Ok(files)
    }

    /// Number of non-blank lines waiting for upload.
    pub fn pending_entries(&self) -> Result<usize> {
        let mut total = 0;
        for file in self.pending_files()? {
            total += jsonl::read_lines(&file)?.len();
        }
        Ok(total)
    }
}

/// Outcome of one append: which of the two files received the entry.
///
/// A failed half is logged and reported here rather than failing the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub archived: bool,
    pub queued: bool,
}

impl Appended {
    pub fn is_complete(&self) -> bool {
        self.archived && self.queued
    }
}

/// Append-only local log: archive files plus the pending queue.
#[derive(Debug)]
pub struct EventStore {
    archive_dir: PathBuf,
    archive_lock: Mutex<()>,
    queue: Arc<QueueDir>,
}

impl EventStore {
    /// Open the store under a data directory (`logs/` and `queue/`).
    pub fn open(data_dir: &Path) -> Result<Self> {
        Self::with_dirs(&data_dir.join(ARCHIVE_DIR_NAME), &data_dir.join(QUEUE_DIR_NAME))
    }

    pub fn with_dirs(archive_dir: &Path, queue_dir: &Path) -> Result<Self> {
        fs::create_dir_all(archive_dir)?;
        Ok(EventStore {
            archive_dir: archive_dir.to_path_buf(),
            archive_lock: Mutex::new(()),
            queue: Arc::new(QueueDir::open(queue_dir)?),
        })
    }

    pub fn archive_path(&self, experiment_id: &str, user_id: &str) -> PathBuf {
        self.archive_dir.join(archive_file_name(experiment_id, user_id))
    }

    pub fn queue(&self) -> &Arc<QueueDir> {
        &self.queue
    }

    /// Append an entry to its archive file and to the queue.
    ///
    /// The two appends are independent: either may fail without blocking
    /// the other. Only a serialization failure is returned as an error.
    pub fn append(&self, entry: &LogEntry) -> Result<Appended> {
        let line = jsonl::to_line(entry)?;

        let archive = self.archive_path(entry.experiment_id(), entry.user_id());
        let archived = {
            let _guard = self.archive_lock.lock().unwrap_or_else(|e| e.into_inner());
            jsonl::append_line(&archive, &line)
        };
        if let Err(e) = &archived {
            tracing::error!(path = %archive.display(), error = %e, "failed to append to archive");
        }

        let queued = self.queue.append_line(&line);
        if let Err(e) = &queued {
            tracing::error!(
                path = %self.queue.active_path().display(),
                error = %e,
                "failed to append to queue; event will not be uploaded"
            );
        }

        Ok(Appended {
            archived: archived.is_ok(),
            queued: queued.is_ok(),
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
