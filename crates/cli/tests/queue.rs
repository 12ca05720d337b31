// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod common;
use common::*;

#[test]
fn log_writes_archive_and_queue() {
    let (_temp, config, data) = setup();

    aura()
        .arg("log")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .args(["tap", "--condition", "Large", "x=12", "hand=left"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged tap for fitts/2"));

    let archive = std::fs::read_to_string(data.join("logs/fitts_2.jsonl")).unwrap();
    let entry: serde_json::Value = serde_json::from_str(archive.trim()).unwrap();
    assert_eq!(entry["event_name"], "tap");
    assert_eq!(entry["condition"], "Large");
    assert_eq!(entry["payload"]["x"], 12);
    assert_eq!(entry["payload"]["hand"], "left");

    let queued = std::fs::read_to_string(data.join("queue/current_queue.jsonl")).unwrap();
    assert_eq!(queued, archive);
}

#[test]
fn log_rejects_bad_field() {
    let (_temp, config, data) = setup();

    aura()
        .arg("log")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .args(["tap", "oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}

#[test]
fn status_counts_pending_entries() {
    let (_temp, config, data) = setup();

    for event in ["a", "b"] {
        aura()
            .arg("log")
            .arg(&config)
            .arg("--data-dir")
            .arg(&data)
            .arg(event)
            .assert()
            .success();
    }

    aura()
        .arg("status")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending files: 1"))
        .stdout(predicate::str::contains("Pending entries: 2"))
        .stdout(predicate::str::contains("(2 entries)"));
}

#[test]
fn sync_with_empty_queue_succeeds() {
    let (_temp, config, data) = setup();

    aura()
        .arg("sync")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .assert()
        .success()
        .stdout("Nothing to upload\n");
}

#[test]
fn sync_against_unreachable_store_keeps_entries() {
    let (_temp, config, data) = setup();

    aura()
        .arg("log")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .arg("tap")
        .assert()
        .success();

    aura()
        .arg("sync")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Retry needed"))
        .stderr(predicate::str::contains("sync needs a retry"));

    // The entry was sealed into a batch file and is still pending.
    aura()
        .arg("status")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending entries: 1"));
}

#[test]
fn query_rejects_invalid_json() {
    let (_temp, config, _data) = setup();

    aura()
        .arg("query")
        .arg(&config)
        .arg("{selector")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid query"));
}

#[test]
fn query_against_unreachable_store_fails() {
    let (_temp, config, _data) = setup();

    aura()
        .arg("query")
        .arg(&config)
        .arg(r#"{"selector": {"user_id": "2"}}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("remote error"));
}
