// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Experiment configuration.
//!
//! A session is configured once with an [`ExperimentConfig`]. The command-line
//! tool reads the same structure from a TOML file:
//!
//! ```toml
//! experiment_id = "fitts"
//! user_id = "7"
//! conditions = ["Small", "Medium", "Large"]
//!
//! [remote]
//! url = "https://couch.example.org"
//! db_name = "aura"
//! username = "lab"
//! password = "secret"
//!
//! [counterbalance]
//! mode = "latin_square"
//! end_condition = "Large"
//!
//! [sync]
//! backoff_step_secs = 10
//! on_malformed = "abort"
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use aura_core::CounterbalanceConfig;

use crate::error::{Error, Result};
use crate::sync::{BackoffPolicy, MalformedLinePolicy, SyncOptions};

/// Everything a session needs, fixed at setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_id: String,
    pub user_id: String,
    /// Available conditions in declared order. Must be distinct.
    #[serde(default)]
    pub conditions: Vec<String>,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub counterbalance: CounterbalanceConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Remote document store endpoint and credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the store (`http://` or `https://`).
    pub url: String,
    /// Database name appended to the base URL.
    pub db_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Accept any TLS certificate. Development servers only.
    #[serde(default)]
    pub insecure_tls: bool,
    /// Timeout for a single HTTP request in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Retry and failure-handling settings for the sync worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Linear backoff step in seconds (default: 10).
    pub backoff_step_secs: u64,
    /// Upper bound for the backoff delay in seconds (default: 300).
    pub max_backoff_secs: u64,
    /// Budget for uploading one queue file in seconds (default: 120).
    pub file_timeout_secs: u64,
    /// What to do with a queued line that does not parse.
    pub on_malformed: MalformedLinePolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            backoff_step_secs: 10,
            max_backoff_secs: 300,
            file_timeout_secs: 120,
            on_malformed: MalformedLinePolicy::Abort,
        }
    }
}

impl SyncSettings {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            step: Duration::from_secs(self.backoff_step_secs),
            max_delay: Duration::from_secs(self.max_backoff_secs.max(self.backoff_step_secs)),
        }
    }

    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            file_timeout: Duration::from_secs(self.file_timeout_secs.max(1)),
            on_malformed: self.on_malformed,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl RemoteConfig {
    /// Value for the `Authorization` header: HTTP Basic over `username:password`.
    pub fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// URL of the database: base URL with exactly one `/` before the name.
    pub fn db_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.db_name)
    }

    /// Validates that the URL is in a recognized format.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            return None;
        }
        Some(format!(
            "invalid remote URL '{}': must start with http:// or https://",
            self.url
        ))
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("db_name", &self.db_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_tls", &self.insecure_tls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ExperimentConfig {
    /// Loads an experiment config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: ExperimentConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Checks ids, the remote URL, and the counterbalance tables.
    pub fn validate(&self) -> Result<()> {
        if self.experiment_id.trim().is_empty() {
            return Err(Error::FieldEmpty {
                field: "experiment_id",
            });
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::FieldEmpty { field: "user_id" });
        }
        if self.remote.db_name.trim().is_empty() {
            return Err(Error::FieldEmpty { field: "db_name" });
        }
        if let Some(msg) = self.remote.validate_url() {
            return Err(Error::Config(msg));
        }
        self.counterbalance.validate(&self.conditions)?;
        Ok(())
    }
}

/// File name of the archive for an (experiment, user) pair.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced so ids can never
/// escape the archive directory.
pub fn archive_file_name(experiment_id: &str, user_id: &str) -> String {
    format!("{}_{}.jsonl", sanitize(experiment_id), sanitize(user_id))
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
