// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod log;
pub mod order;
pub mod query;
pub mod status;
pub mod sync;

use std::path::Path;

use crate::config::ExperimentConfig;
use crate::error::{Error, Result};

/// Load and validate an experiment config, optionally for another participant.
pub fn load_config(path: &Path, user: Option<&str>) -> Result<ExperimentConfig> {
    let mut config = ExperimentConfig::load(path)?;
    if let Some(user) = user {
        config.user_id = user.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Create the runtime used by commands that talk to the remote store.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
pub(crate) mod testing;
