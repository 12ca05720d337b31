// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};

use aura_core::jsonl;

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::store::EventStore;

use super::load_config;

pub fn run(config_path: &Path, data_dir: &Path) -> Result<()> {
    let config = load_config(config_path, None)?;
    let store = EventStore::open(data_dir)?;
    print!("{}", render(&store, &config)?);
    Ok(())
}

pub(crate) fn render(store: &EventStore, config: &ExperimentConfig) -> Result<String> {
    let queue = store.queue();
    let files = queue.pending_files()?;
    let entries = queue.pending_entries()?;

    let mut out = String::new();
    out.push_str(&format!("Queue: {}\n", queue.path().display()));
    out.push_str(&format!("Pending files: {}\n", files.len()));
    out.push_str(&format!("Pending entries: {}\n", entries));

    let oldest = files
        .iter()
        .filter_map(|f| fs::metadata(f).and_then(|m| m.modified()).ok())
        .min();
    if let Some(oldest) = oldest {
        out.push_str(&format!("Oldest pending: {}\n", format_time(oldest)));
    }

    let archive = store.archive_path(&config.experiment_id, &config.user_id);
    if archive.exists() {
        let archived = jsonl::read_lines(&archive)?.len();
        out.push_str(&format!(
            "Archive: {} ({} entries)\n",
            archive.display(),
            archived
        ));
    } else {
        out.push_str(&format!("Archive: {} (not created yet)\n", archive.display()));
    }
    Ok(out)
}

fn format_time(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
