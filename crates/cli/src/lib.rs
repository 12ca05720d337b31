// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! aura - experiment telemetry client library.
//!
//! This crate provides the session used by experiment software to record
//! participant events, and the functionality behind the `aura` CLI.
//!
//! # Main Components
//!
//! - [`ExperimentSession`] - configure once, then log events and ask for condition orders
//! - [`EventStore`] - local archive and upload queue (JSON Lines)
//! - [`sync`] - queue drain, background scheduler, and the remote store client
//! - [`ExperimentConfig`] - experiment, participant, remote, and sync settings
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use aura::{ExperimentConfig, ExperimentSession};
//!
//! let session = ExperimentSession::new(&data_dir, runtime.handle().clone());
//! session.setup(ExperimentConfig::load(Path::new("experiment.toml"))?)?;
//!
//! for condition in session.order()? {
//!     session.set_condition(&condition)?;
//!     session.log_event("trial_end", payload)?;
//! }
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod sync;

pub use cli::{Cli, Command, DataDirArgs};
pub use config::{ExperimentConfig, RemoteConfig, SyncSettings};
pub use error::{Error, Result};
pub use session::{ExperimentSession, DEFAULT_CONDITION};
pub use store::{Appended, EventStore, QueueDir};

/// Execute a parsed CLI command.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Order { config, user } => commands::order::run(&config, user.as_deref()),
        Command::Summary { config, user } => {
            commands::order::run_summary(&config, user.as_deref())
        }
        Command::Status { config, data } => commands::status::run(&config, &data.resolve()?),
        Command::Sync { config, data } => commands::sync::run(&config, &data.resolve()?),
        Command::Log {
            config,
            data,
            event,
            condition,
            fields,
        } => commands::log::run(
            &config,
            &data.resolve()?,
            &event,
            condition.as_deref(),
            &fields,
        ),
        Command::Query { config, query } => commands::query::run(&config, &query),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
