// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use aura_core::SystemClock;

use crate::config::ExperimentConfig;
use crate::error::{Error, Result};
use crate::store::EventStore;
use crate::sync::{CouchDbClient, DrainOutcome, DrainReport, RemoteClient, SyncWorker};

use super::{load_config, runtime};

pub fn run(config_path: &Path, data_dir: &Path) -> Result<()> {
    let config = load_config(config_path, None)?;
    let store = EventStore::open(data_dir)?;
    let remote: Arc<dyn RemoteClient> = Arc::new(CouchDbClient::new(&config.remote)?);

    let report = runtime()?.block_on(run_impl(&store, remote, &config));
    print!("{}", render(&report));
    match report.failure() {
        Some(failure) => Err(Error::SyncIncomplete(failure.to_string())),
        None => Ok(()),
    }
}

/// Drain the queue once with the given remote.
pub(crate) async fn run_impl(
    store: &EventStore,
    remote: Arc<dyn RemoteClient>,
    config: &ExperimentConfig,
) -> DrainReport {
    let worker = SyncWorker::new(
        Arc::clone(store.queue()),
        remote,
        config.sync.options(),
        Arc::new(SystemClock),
    );
    worker.drain().await
}

pub(crate) fn render(report: &DrainReport) -> String {
    let mut out = String::new();
    match &report.outcome {
        DrainOutcome::Idle => {
            out.push_str("Nothing to upload\n");
            return out;
        }
        DrainOutcome::Complete => out.push_str("Queue drained\n"),
        DrainOutcome::RetryNeeded { file, failure } => {
            out.push_str(&format!("Retry needed: {}: {}\n", file.display(), failure));
        }
    }
    out.push_str(&format!(
        "Uploaded {} entries, {} files completed\n",
        report.entries_uploaded, report.files_completed
    ));
    if report.entries_skipped > 0 {
        out.push_str(&format!("Skipped {} malformed lines\n", report.entries_skipped));
    }
    out
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
