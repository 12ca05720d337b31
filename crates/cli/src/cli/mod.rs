// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::{Error, Result};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> std::result::Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser)]
#[command(name = "aura")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Experiment telemetry: counterbalanced condition orders and durable event upload")]
#[command(
    long_about = "Experiment telemetry: counterbalanced condition orders and durable event upload.\n\n\
    Every command reads an experiment config (TOML). Events are written to local JSONL\n\
    files first and uploaded to a CouchDB-compatible store when `aura sync` runs."
)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Location of the local archive and queue.
#[derive(Args, Clone, Debug, Default)]
pub struct DataDirArgs {
    /// Data directory holding logs/ and queue/ (default: platform data dir)
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

impl DataDirArgs {
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|d| d.join("aura"))
            .ok_or_else(|| {
                Error::Config(
                    "could not determine a data directory\n  hint: pass --data-dir".to_string(),
                )
            })
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the condition order for a participant, one per line
    #[command(after_help = "\
Examples:
  aura order experiment.toml             Order for the configured participant
  aura order experiment.toml --user 12   Order for participant 12")]
    Order {
        /// Experiment config file
        config: PathBuf,

        /// Participant id (overrides user_id from the config)
        #[arg(long, short, value_parser = non_empty_string)]
        user: Option<String>,
    },

    /// Print the counterbalancing table for a participant
    Summary {
        /// Experiment config file
        config: PathBuf,

        /// Participant id (overrides user_id from the config)
        #[arg(long, short, value_parser = non_empty_string)]
        user: Option<String>,
    },

    /// Show entries waiting in the local queue
    Status {
        /// Experiment config file
        config: PathBuf,

        #[command(flatten)]
        data: DataDirArgs,
    },

    /// Upload queued entries once; exits non-zero if a retry is needed
    Sync {
        /// Experiment config file
        config: PathBuf,

        #[command(flatten)]
        data: DataDirArgs,
    },

    /// Record one event locally without uploading it
    #[command(after_help = "\
Examples:
  aura log exp.toml trial_end                       Event with no payload
  aura log exp.toml tap -c Large x=12 hit=true      Payload values parsed as JSON scalars
  aura log exp.toml note text=\"left handed\"         Anything else is kept as a string")]
    Log {
        /// Experiment config file
        config: PathBuf,

        #[command(flatten)]
        data: DataDirArgs,

        /// Event name
        #[arg(value_parser = non_empty_string)]
        event: String,

        /// Condition to stamp on the entry (default: Unknown)
        #[arg(long, short, value_parser = non_empty_string)]
        condition: Option<String>,

        /// Payload fields as key=value
        #[arg(value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Run a Mango query against the remote store and print matching documents
    #[command(after_help = "\
Examples:
  aura query exp.toml '{\"selector\": {\"event_name\": \"condition_started\"}}'")]
    Query {
        /// Experiment config file
        config: PathBuf,

        /// Query as JSON, e.g. {"selector": {...}, "limit": 10}
        query: String,
    },
}
