// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::sample_config;
use crate::sync::test_helpers::{make_entry, MockRemote};

#[tokio::test]
async fn empty_queue_reports_nothing_to_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let store = EventStore::open(&dir.path().join("data")).unwrap();

    let report = run_impl(&store, MockRemote::new(), &config).await;
    assert_eq!(render(&report), "Nothing to upload\n");
}

#[tokio::test]
async fn drains_queue_and_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let store = EventStore::open(&dir.path().join("data")).unwrap();
    store.append(&make_entry(1)).unwrap();
    store.append(&make_entry(2)).unwrap();

    let remote = MockRemote::new();
    let report = run_impl(&store, remote.clone(), &config).await;
    assert_eq!(
        render(&report),
        "Queue drained\nUploaded 2 entries, 1 files completed\n"
    );
    assert_eq!(remote.inserted().len(), 2);
    assert_eq!(store.queue().pending_entries().unwrap(), 0);
}

#[tokio::test]
async fn failed_upload_reports_retry() {
    let dir = tempfile::tempdir().unwrap();
    let config = sample_config(dir.path());
    let store = EventStore::open(&dir.path().join("data")).unwrap();
    store.append(&make_entry(1)).unwrap();

    let remote = MockRemote::new();
    remote.fail_after(0);
    let report = run_impl(&store, remote, &config).await;

    assert!(report.needs_retry());
    let out = render(&report);
    assert!(out.starts_with("Retry needed: "), "{}", out);
    assert!(out.contains("HTTP 503"), "{}", out);
    assert_eq!(store.queue().pending_entries().unwrap(), 1);
}
