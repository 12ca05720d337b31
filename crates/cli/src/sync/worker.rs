// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue drain: uploads sealed queue files oldest-first.
//!
//! A file is the unit of success. Every line confirmed by the remote store
//! means the file is deleted; the first failure stops the drain and leaves
//! that file and every later one in place for the next attempt.
//!
//! Queue file I/O (seal, listing, reads, deletes) runs on tokio's blocking
//! pool so fsync and directory scans never stall the async workers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use aura_core::{jsonl, ClockSource, LogEntry};

use super::remote::{RemoteClient, RemoteError};
use crate::store::{QueueDir, UPLOADED_EXTENSION};

/// What to do with a queued line that does not deserialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedLinePolicy {
    /// Stop the file and retry it later.
    #[default]
    Abort,
    /// Log the line, count it, and continue with the rest of the file.
    Skip,
}

/// Per-drain behavior of the worker.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Time allowed for uploading one queue file.
    pub file_timeout: Duration,
    pub on_malformed: MalformedLinePolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            file_timeout: Duration::from_secs(120),
            on_malformed: MalformedLinePolicy::Abort,
        }
    }
}

/// Why a queue file could not be fully uploaded.
#[derive(Debug, thiserror::Error)]
pub enum UploadFailure {
    #[error("line {line}: malformed entry: {source}")]
    Malformed { line: usize, source: aura_core::Error },

    #[error("line {line}: {source}")]
    Remote { line: usize, source: RemoteError },

    #[error("failed to read queue file: {0}")]
    Read(#[from] aura_core::Error),

    #[error("failed to prepare queue: {0}")]
    Queue(#[source] crate::error::Error),

    #[error("upload did not finish within {0:?}")]
    Timeout(Duration),
}

/// How a drain ended.
#[derive(Debug, Default)]
pub enum DrainOutcome {
    /// Nothing was pending.
    #[default]
    Idle,
    /// Every pending file was uploaded.
    Complete,
    /// A file failed; it and all later files remain queued.
    RetryNeeded { file: PathBuf, failure: UploadFailure },
}

/// Summary of one drain.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub files_completed: usize,
    pub entries_uploaded: usize,
    pub entries_skipped: usize,
    pub outcome: DrainOutcome,
}

impl DrainReport {
    pub fn needs_retry(&self) -> bool {
        matches!(self.outcome, DrainOutcome::RetryNeeded { .. })
    }

    /// The failure that stopped the drain, if any.
    pub fn failure(&self) -> Option<&UploadFailure> {
        match &self.outcome {
            DrainOutcome::RetryNeeded { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct FileStats {
    uploaded: usize,
    skipped: usize,
}

/// Uploads queue files to the remote store.
pub struct SyncWorker<R: RemoteClient + ?Sized = dyn RemoteClient> {
    queue: Arc<QueueDir>,
    remote: Arc<R>,
    options: SyncOptions,
    clock: Arc<dyn ClockSource>,
}

impl<R: RemoteClient + ?Sized> SyncWorker<R> {
    pub fn new(
        queue: Arc<QueueDir>,
        remote: Arc<R>,
        options: SyncOptions,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        SyncWorker {
            queue,
            remote,
            options,
            clock,
        }
    }

    /// Seal the active file, then upload sealed files oldest-first.
    ///
    /// Stops at the first failure. Never returns an error: failures are
    /// reported in the [`DrainReport`] for the caller to reschedule.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();

        let now_ms = self.clock.now_ms();
        let queue = Arc::clone(&self.queue);
        if let Err(e) = blocking(move || queue.seal(now_ms)).await {
            tracing::warn!(error = %e, "failed to seal active queue file");
            report.outcome = DrainOutcome::RetryNeeded {
                file: self.queue.active_path(),
                failure: UploadFailure::Queue(e),
            };
            return report;
        }

        let queue = Arc::clone(&self.queue);
        let files = match blocking(move || queue.sealed_files()).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list queue files");
                report.outcome = DrainOutcome::RetryNeeded {
                    file: self.queue.path().to_path_buf(),
                    failure: UploadFailure::Queue(e),
                };
                return report;
            }
        };
        if files.is_empty() {
            return report;
        }

        for file in files {
            let mut stats = FileStats::default();
            let result =
                tokio::time::timeout(self.options.file_timeout, self.upload_file(&file, &mut stats))
                    .await;
            report.entries_uploaded += stats.uploaded;
            report.entries_skipped += stats.skipped;

            let failure = match result {
                Ok(Ok(())) => {
                    let done = file.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || commit(&done)).await {
                        tracing::error!(file = %file.display(), error = %e, "queue file commit task failed");
                    }
                    report.files_completed += 1;
                    continue;
                }
                Ok(Err(failure)) => failure,
                Err(_) => UploadFailure::Timeout(self.options.file_timeout),
            };

            tracing::warn!(
                file = %file.display(),
                uploaded = stats.uploaded,
                error = %failure,
                "queue file upload incomplete; will retry"
            );
            report.outcome = DrainOutcome::RetryNeeded { file, failure };
            return report;
        }

        tracing::info!(
            files = report.files_completed,
            entries = report.entries_uploaded,
            skipped = report.entries_skipped,
            "queue drained"
        );
        report.outcome = DrainOutcome::Complete;
        report
    }

    async fn upload_file(&self, path: &Path, stats: &mut FileStats) -> Result<(), UploadFailure> {
        let owned = path.to_path_buf();
        let lines = blocking(move || jsonl::read_lines(&owned)).await?;
        for (line_no, line) in lines {
            let entry = match LogEntry::from_line(&line) {
                Ok(entry) => entry,
                Err(source) => match self.options.on_malformed {
                    MalformedLinePolicy::Abort => {
                        return Err(UploadFailure::Malformed {
                            line: line_no,
                            source,
                        })
                    }
                    MalformedLinePolicy::Skip => {
                        tracing::warn!(
                            file = %path.display(),
                            line = line_no,
                            error = %source,
                            "skipping malformed queue line"
                        );
                        stats.skipped += 1;
                        continue;
                    }
                },
            };
            self.remote
                .insert(&entry)
                .await
                .map_err(|source| UploadFailure::Remote {
                    line: line_no,
                    source,
                })?;
            stats.uploaded += 1;
        }
        Ok(())
    }
}

/// Run blocking queue file I/O on the blocking pool, off the async workers.
async fn blocking<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<std::io::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(std::io::Error::new(std::io::ErrorKind::Other, e).into()))
}

/// Remove a fully uploaded file, or mark it so it is not sent again.
fn commit(path: &Path) {
    let err = match fs::remove_file(path) {
        Ok(()) => return,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => e,
    };
    tracing::error!(
        file = %path.display(),
        error = %err,
        "failed to delete uploaded queue file"
    );

    let marked = path.with_extension(UPLOADED_EXTENSION);
    if let Err(e) = fs::rename(path, &marked) {
        tracing::error!(
            file = %path.display(),
            error = %e,
            "failed to mark queue file as uploaded; its entries will be sent again"
        );
    }
}
