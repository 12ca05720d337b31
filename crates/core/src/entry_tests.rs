// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

fn sample() -> LogEntry {
    let mut payload = Payload::new();
    payload.insert("target_size".into(), json!(48));
    payload.insert("hit".into(), json!(true));
    LogEntry::new("fitts", "7", "Small", "tap", 1_700_000_000_123, payload)
}

#[test]
fn serializes_with_snake_case_wire_keys() {
    let value = serde_json::to_value(sample()).unwrap();
    let obj = value.as_object().unwrap();

    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["condition", "event_name", "experiment_id", "payload", "timestamp", "user_id"]
    );
    assert_eq!(obj["timestamp"], json!(1_700_000_000_123u64));
    assert_eq!(obj["payload"]["target_size"], json!(48));
}

#[test]
fn from_line_reads_serialized_form() {
    let entry = sample();
    let line = serde_json::to_string(&entry).unwrap();

    let parsed = LogEntry::from_line(&line).unwrap();
    assert_eq!(parsed, entry);
    assert_eq!(parsed.condition(), "Small");
    assert_eq!(parsed.timestamp(), 1_700_000_000_123);
}

#[test]
fn missing_payload_defaults_to_empty() {
    let line = r#"{"experiment_id":"e","user_id":"u","condition":"c","event_name":"n","timestamp":1}"#;
    let parsed = LogEntry::from_line(line).unwrap();
    assert!(parsed.payload().is_empty());
}

#[parameterized(
    not_json = { "{oops" },
    missing_timestamp = { r#"{"experiment_id":"e","user_id":"u","condition":"c","event_name":"n"}"# },
    negative_timestamp = { r#"{"experiment_id":"e","user_id":"u","condition":"c","event_name":"n","timestamp":-5}"# },
    empty_object = { "{}" },
)]
fn from_line_rejects_malformed(line: &str) {
    assert!(LogEntry::from_line(line).is_err());
}
