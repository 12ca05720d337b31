// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::RemoteError;

/// All possible errors that can occur in the aura library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session not configured\n  hint: call setup with an experiment config first")]
    NotInitialized,

    #[error("session already configured for experiment '{0}'\n  hint: the config is fixed for the lifetime of a session")]
    AlreadyConfigured(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("counterbalance error: {0}")]
    Counterbalance(aura_core::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid payload field '{0}'\n  hint: use key=value")]
    InvalidPayloadField(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("sync needs a retry: {0}")]
    SyncIncomplete(String),
}

/// A specialized Result type for aura operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<aura_core::Error> for Error {
    fn from(e: aura_core::Error) -> Self {
        match e {
            aura_core::Error::Io(e) => Error::Io(e),
            aura_core::Error::Json(e) => Error::Json(e),
            other => Error::Counterbalance(other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
