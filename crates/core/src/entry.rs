// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The log entry record written to the archive and queue files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event payload: flat string-keyed map of JSON scalars.
pub type Payload = serde_json::Map<String, Value>;

/// Event name emitted whenever the session switches condition.
pub const CONDITION_STARTED: &str = "condition_started";

/// A single timestamped experiment event.
///
/// Entries are immutable once created: the timestamp is captured at
/// construction and there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    experiment_id: String,
    user_id: String,
    condition: String,
    event_name: String,
    /// Capture time in milliseconds since Unix epoch.
    timestamp: u64,
    #[serde(default)]
    payload: Payload,
}

impl LogEntry {
    pub fn new(
        experiment_id: impl Into<String>,
        user_id: impl Into<String>,
        condition: impl Into<String>,
        event_name: impl Into<String>,
        timestamp: u64,
        payload: Payload,
    ) -> Self {
        LogEntry {
            experiment_id: experiment_id.into(),
            user_id: user_id.into(),
            condition: condition.into(),
            event_name: event_name.into(),
            timestamp,
            payload,
        }
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Parses one line of a JSONL archive or queue file.
    pub fn from_line(line: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
