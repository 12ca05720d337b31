// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    not_initialized = { Error::NotInitialized, "setup" },
    already = { Error::AlreadyConfigured("fitts".into()), "fitts" },
    field_empty = { Error::FieldEmpty { field: "user_id" }, "user_id cannot be empty" },
    payload = { Error::InvalidPayloadField("oops".into()), "key=value" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn core_io_and_json_errors_are_flattened() {
    let io = aura_core::Error::Io(std::io::Error::other("disk"));
    assert!(matches!(Error::from(io), Error::Io(_)));

    let json = aura_core::Error::Json(serde_json::from_str::<()>("x").unwrap_err());
    assert!(matches!(Error::from(json), Error::Json(_)));
}

#[test]
fn core_counterbalance_errors_are_wrapped() {
    let err: Error = aura_core::Error::MissingCustomOrders.into();
    assert!(matches!(err, Error::Counterbalance(_)));
    assert!(err.to_string().contains("custom_orders"));
}

#[test]
fn remote_errors_convert() {
    let err: Error = RemoteError::Timeout.into();
    assert!(matches!(err, Error::Remote(RemoteError::Timeout)));
}
