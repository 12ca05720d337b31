// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use serde_json::Value;

use aura_core::{ClockSource, LogEntry, Payload, SystemClock};

use crate::config::ExperimentConfig;
use crate::error::{Error, Result};
use crate::session::DEFAULT_CONDITION;
use crate::store::{Appended, EventStore};

use super::load_config;

pub fn run(
    config_path: &Path,
    data_dir: &Path,
    event: &str,
    condition: Option<&str>,
    fields: &[String],
) -> Result<()> {
    let config = load_config(config_path, None)?;
    let payload = parse_fields(fields)?;
    let store = EventStore::open(data_dir)?;

    let appended = run_impl(&store, &config, &SystemClock, event, condition, payload)?;
    if !appended.archived {
        eprintln!("warning: entry was not written to the archive");
    }
    if !appended.queued {
        eprintln!("warning: entry was not queued and will not be uploaded");
    }
    println!(
        "Logged {} for {}/{}",
        event, config.experiment_id, config.user_id
    );
    Ok(())
}

/// Internal implementation that accepts the store and clock for testing.
pub(crate) fn run_impl(
    store: &EventStore,
    config: &ExperimentConfig,
    clock: &dyn ClockSource,
    event: &str,
    condition: Option<&str>,
    payload: Payload,
) -> Result<Appended> {
    let entry = LogEntry::new(
        config.experiment_id.as_str(),
        config.user_id.as_str(),
        condition.unwrap_or(DEFAULT_CONDITION),
        event,
        clock.now_ms(),
        payload,
    );
    store.append(&entry)
}

/// Parse `key=value` arguments into a payload.
///
/// Values that parse as a JSON scalar (number, bool, null, quoted string)
/// keep that type; anything else is stored as a plain string.
pub(crate) fn parse_fields(fields: &[String]) -> Result<Payload> {
    let mut payload = Payload::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .ok_or_else(|| Error::InvalidPayloadField(field.clone()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidPayloadField(field.clone()));
        }
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v) if !v.is_array() && !v.is_object() => v,
            _ => Value::String(raw.to_string()),
        };
        payload.insert(key.to_string(), value);
    }
    Ok(payload)
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
