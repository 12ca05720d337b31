// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the background drain scheduler.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use aura_core::jsonl;
use tempfile::TempDir;
use tokio::runtime::Handle;
use yare::parameterized;

use super::scheduler::{
    BackoffPolicy, SharedSyncState, SyncScheduler, STATE_BACKING_OFF, STATE_IDLE, STATE_STOPPED,
};
use super::test_helpers::{make_entry, FixedClock, MockRemote};
use super::worker::{SyncOptions, SyncWorker};
use crate::store::QueueDir;

const FAST_BACKOFF: BackoffPolicy = BackoffPolicy {
    step: Duration::from_millis(10),
    max_delay: Duration::from_millis(50),
};

fn scheduler_with(
    dir: &TempDir,
    remote: &Arc<MockRemote>,
) -> (Arc<QueueDir>, SyncScheduler<MockRemote>) {
    let queue = Arc::new(QueueDir::open(dir.path()).unwrap());
    let worker = SyncWorker::new(
        Arc::clone(&queue),
        Arc::clone(remote),
        SyncOptions::default(),
        FixedClock::at(1),
    );
    let scheduler = SyncScheduler::spawn(Arc::new(worker), FAST_BACKOFF, &Handle::current());
    (queue, scheduler)
}

fn enqueue(queue: &QueueDir, ts: u64) {
    queue
        .append_line(&jsonl::to_line(&make_entry(ts)).unwrap())
        .unwrap();
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(cond(), "condition not reached within 5s");
}

#[parameterized(
    first = { 1, 10 },
    second = { 2, 20 },
    capped = { 31, 300 },
    zero_treated_as_first = { 0, 10 },
)]
fn backoff_is_linear_and_capped(attempt: u32, expected_secs: u64) {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay_for(attempt), Duration::from_secs(expected_secs));
}

#[test]
fn status_string_reflects_state() {
    let state = SharedSyncState::new();
    assert_eq!(state.status_string(), "idle");
    state.set(STATE_BACKING_OFF);
    state.set_attempt(3);
    assert_eq!(state.status_string(), "backing off (attempt 3)");
    state.set(STATE_STOPPED);
    assert_eq!(state.status_string(), "stopped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trigger_drains_in_background() {
    let dir = TempDir::new().unwrap();
    let remote = MockRemote::new();
    let (queue, scheduler) = scheduler_with(&dir, &remote);

    enqueue(&queue, 1);
    enqueue(&queue, 2);
    scheduler.trigger();

    wait_until(|| remote.inserted().len() == 2).await;
    wait_until(|| queue.pending_entries().unwrap() == 0).await;
    assert_eq!(scheduler.state().uploaded(), 2);
    assert!(scheduler.state().completed_runs() >= 1);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drains_never_overlap() {
    let dir = TempDir::new().unwrap();
    let remote = MockRemote::new();
    remote.set_insert_delay(Duration::from_millis(2));
    let (queue, scheduler) = scheduler_with(&dir, &remote);
    let scheduler = Arc::new(scheduler);

    let mut inline = Vec::new();
    for ts in 0..40 {
        enqueue(&queue, ts);
        scheduler.trigger();
        if ts % 10 == 0 {
            let scheduler = Arc::clone(&scheduler);
            inline.push(tokio::spawn(async move { scheduler.run_now().await }));
        }
    }
    for handle in inline {
        handle.await.unwrap();
    }
    scheduler.trigger();

    wait_until(|| queue.pending_entries().unwrap() == 0).await;
    assert_eq!(remote.max_in_flight(), 1);
    assert_eq!(remote.inserted().len(), 40);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_drain_backs_off_and_retries() {
    let dir = TempDir::new().unwrap();
    let remote = MockRemote::new();
    remote.fail_after(0);
    let (queue, scheduler) = scheduler_with(&dir, &remote);

    enqueue(&queue, 1);
    scheduler.trigger();

    wait_until(|| remote.attempts() >= 3).await;
    assert!(scheduler.state().last_error().is_some());
    assert_eq!(queue.pending_entries().unwrap(), 1);

    // No new trigger needed: the backoff loop keeps retrying.
    remote.recover();
    wait_until(|| scheduler.state().get() == STATE_IDLE && remote.inserted().len() == 1).await;
    assert_eq!(scheduler.state().attempt(), 0);
    assert!(scheduler.state().last_error().is_none());
    scheduler.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_background_task() {
    let dir = TempDir::new().unwrap();
    let remote = MockRemote::new();
    let (queue, scheduler) = scheduler_with(&dir, &remote);

    scheduler.shutdown().await;
    assert_eq!(scheduler.state().get(), STATE_STOPPED);
    assert!(scheduler.cancel_token().is_cancelled());

    enqueue(&queue, 1);
    scheduler.trigger();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(remote.attempts(), 0);

    // Inline drains still work after shutdown.
    let report = scheduler.run_now().await;
    assert_eq!(report.entries_uploaded, 1);
}
