// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background scheduling of queue drains.
//!
//! One task per session waits on a coalescing notification. Each trigger
//! runs a drain; a drain that needs a retry is repeated after a linearly
//! growing delay until it succeeds or the task is cancelled. Drains never
//! overlap: the background loop and [`SyncScheduler::run_now`] share a slot.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::remote::RemoteClient;
use super::worker::{DrainReport, SyncWorker};

/// Scheduler state values for the atomic state field.
pub const STATE_IDLE: u8 = 0;
pub const STATE_RUNNING: u8 = 1;
pub const STATE_BACKING_OFF: u8 = 2;
pub const STATE_STOPPED: u8 = 3;

/// Linear retry delay: `step * attempt`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub step: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            step: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt.max(1)).min(self.max_delay)
    }
}

/// Scheduler status visible to the session and the CLI.
///
/// Uses atomic fields for lock-free reads.
#[derive(Debug)]
pub struct SharedSyncState {
    state: AtomicU8,
    attempt: AtomicU32,
    completed_runs: AtomicU64,
    uploaded: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SharedSyncState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_IDLE),
            attempt: AtomicU32::new(0),
            completed_runs: AtomicU64::new(0),
            uploaded: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn get(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    pub fn set(&self, state: u8) {
        self.state.store(state, Ordering::Release);
    }

    /// Current retry attempt; zero when not backing off.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    pub fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    /// Number of drains that finished without needing a retry.
    pub fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::Acquire)
    }

    /// Entries uploaded over the lifetime of the session.
    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, report: &DrainReport) {
        self.uploaded
            .fetch_add(report.entries_uploaded as u64, Ordering::AcqRel);
        let mut last_error = self.last_error.lock().unwrap_or_else(|e| e.into_inner());
        match report.failure() {
            Some(failure) => *last_error = Some(failure.to_string()),
            None => {
                self.completed_runs.fetch_add(1, Ordering::AcqRel);
                *last_error = None;
            }
        }
    }

    /// Human-readable status string.
    pub fn status_string(&self) -> String {
        match self.get() {
            STATE_IDLE => "idle".to_string(),
            STATE_RUNNING => "syncing".to_string(),
            STATE_BACKING_OFF => format!("backing off (attempt {})", self.attempt()),
            STATE_STOPPED => "stopped".to_string(),
            _ => "unknown".to_string(),
        }
    }
}

impl Default for SharedSyncState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the background drain task of a session.
pub struct SyncScheduler<R: RemoteClient + ?Sized + 'static = dyn RemoteClient> {
    worker: Arc<SyncWorker<R>>,
    slot: Arc<tokio::sync::Mutex<()>>,
    wake: Arc<Notify>,
    state: Arc<SharedSyncState>,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: RemoteClient + ?Sized + 'static> SyncScheduler<R> {
    /// Spawn the background task on the given runtime.
    pub fn spawn(worker: Arc<SyncWorker<R>>, backoff: BackoffPolicy, runtime: &Handle) -> Self {
        let slot = Arc::new(tokio::sync::Mutex::new(()));
        let wake = Arc::new(Notify::new());
        let state = Arc::new(SharedSyncState::new());
        let cancel_token = CancellationToken::new();

        let task = runtime.spawn(run_loop(
            Arc::clone(&worker),
            backoff,
            Arc::clone(&slot),
            Arc::clone(&wake),
            Arc::clone(&state),
            cancel_token.clone(),
        ));

        SyncScheduler {
            worker,
            slot,
            wake,
            state,
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Request a drain. Never blocks.
    ///
    /// Triggers that arrive while a drain is running collapse into a single
    /// follow-up drain.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Run one drain inline, waiting for any background drain to finish first.
    pub async fn run_now(&self) -> DrainReport {
        let _slot = self.slot.lock().await;
        let report = self.worker.drain().await;
        self.state.record(&report);
        report
    }

    pub fn state(&self) -> &Arc<SharedSyncState> {
        &self.state
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Cancel the background task and wait for it to exit.
    ///
    /// A file whose upload was interrupted is retried in full next time.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "sync task ended abnormally");
            }
        }
        self.state.set(STATE_STOPPED);
    }
}

impl<R: RemoteClient + ?Sized + 'static> Drop for SyncScheduler<R> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn run_loop<R: RemoteClient + ?Sized + 'static>(
    worker: Arc<SyncWorker<R>>,
    backoff: BackoffPolicy,
    slot: Arc<tokio::sync::Mutex<()>>,
    wake: Arc<Notify>,
    state: Arc<SharedSyncState>,
    cancel_token: CancellationToken,
) {
    'outer: loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break 'outer,
            _ = wake.notified() => {}
        }

        let mut attempt = 0u32;
        loop {
            let report = {
                let _slot = tokio::select! {
                    _ = cancel_token.cancelled() => break 'outer,
                    guard = slot.lock() => guard,
                };
                state.set(STATE_RUNNING);
                tokio::select! {
                    _ = cancel_token.cancelled() => break 'outer,
                    report = worker.drain() => report,
                }
            };
            state.record(&report);

            if !report.needs_retry() {
                state.set_attempt(0);
                state.set(STATE_IDLE);
                break;
            }

            attempt = attempt.saturating_add(1);
            state.set_attempt(attempt);
            state.set(STATE_BACKING_OFF);
            let delay = backoff.delay_for(attempt);
            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "sync incomplete; backing off"
            );

            tokio::select! {
                _ = cancel_token.cancelled() => break 'outer,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
    state.set(STATE_STOPPED);
    tracing::debug!("sync task stopped");
}
