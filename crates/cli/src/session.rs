// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The caller-facing experiment session.
//!
//! A session starts unconfigured. [`ExperimentSession::setup`] fixes the
//! experiment config, opens the local store and starts the background sync
//! task; every other operation fails with [`Error::NotInitialized`] until
//! then. Logging is synchronous to disk and never waits on the network.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::runtime::Handle;

use aura_core::{ClockSource, CounterbalanceResult, LogEntry, Payload, SystemClock, CONDITION_STARTED};

use crate::config::ExperimentConfig;
use crate::error::{Error, Result};
use crate::store::{Appended, EventStore};
use crate::sync::{
    CouchDbClient, DrainReport, FindResponse, MangoQuery, RemoteClient, SharedSyncState,
    SyncScheduler, SyncWorker,
};

/// Condition recorded on entries logged before any `set_condition`.
pub const DEFAULT_CONDITION: &str = "Unknown";

/// Documents requested per page when collecting completed conditions.
const COMPLETED_PAGE_SIZE: u32 = 200;

struct Configured {
    config: ExperimentConfig,
    store: EventStore,
    remote: Arc<dyn RemoteClient>,
    scheduler: SyncScheduler,
}

/// One participant's run of an experiment.
pub struct ExperimentSession {
    data_dir: PathBuf,
    runtime: Handle,
    clock: Arc<dyn ClockSource>,
    remote_override: Option<Arc<dyn RemoteClient>>,
    setup_lock: Mutex<()>,
    configured: OnceLock<Configured>,
    condition: Mutex<String>,
}

impl ExperimentSession {
    /// Create an unconfigured session storing its files under `data_dir`.
    ///
    /// The background sync task is spawned on `runtime` during setup.
    pub fn new(data_dir: &Path, runtime: Handle) -> Self {
        ExperimentSession {
            data_dir: data_dir.to_path_buf(),
            runtime,
            clock: Arc::new(SystemClock),
            remote_override: None,
            setup_lock: Mutex::new(()),
            configured: OnceLock::new(),
            condition: Mutex::new(DEFAULT_CONDITION.to_string()),
        }
    }

    /// Use the given remote client instead of building one from the config.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteClient>) -> Self {
        self.remote_override = Some(remote);
        self
    }

    /// Stamp entries with the given clock.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn configured(&self) -> Result<&Configured> {
        self.configured.get().ok_or(Error::NotInitialized)
    }

    /// Configure the session. Allowed once.
    ///
    /// Starts the background sync task and requests an initial drain so
    /// entries left over from earlier runs are uploaded.
    pub fn setup(&self, config: ExperimentConfig) -> Result<()> {
        let _guard = self.setup_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = self.configured.get() {
            return Err(Error::AlreadyConfigured(existing.config.experiment_id.clone()));
        }
        config.validate()?;

        let store = EventStore::open(&self.data_dir)?;
        let remote: Arc<dyn RemoteClient> = match &self.remote_override {
            Some(remote) => Arc::clone(remote),
            None => Arc::new(CouchDbClient::new(&config.remote)?),
        };
        let worker = SyncWorker::new(
            Arc::clone(store.queue()),
            Arc::clone(&remote),
            config.sync.options(),
            Arc::clone(&self.clock),
        );
        let scheduler = SyncScheduler::spawn(Arc::new(worker), config.sync.backoff(), &self.runtime);

        tracing::info!(
            experiment = %config.experiment_id,
            user = %config.user_id,
            conditions = config.conditions.len(),
            mode = %config.counterbalance.mode,
            "session configured"
        );

        let configured = Configured {
            config,
            store,
            remote,
            scheduler,
        };
        if self.configured.set(configured).is_err() {
            return Err(Error::AlreadyConfigured(String::new()));
        }
        self.configured()?.scheduler.trigger();
        Ok(())
    }

    pub fn config(&self) -> Result<&ExperimentConfig> {
        Ok(&self.configured()?.config)
    }

    /// Condition stamped on entries logged now.
    pub fn current_condition(&self) -> Result<String> {
        self.configured()?;
        Ok(self.condition.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Switch condition and log a `condition_started` event for it.
    pub fn set_condition(&self, name: &str) -> Result<Appended> {
        let configured = self.configured()?;
        if name.trim().is_empty() {
            return Err(Error::FieldEmpty { field: "condition" });
        }
        let mut payload = Payload::new();
        payload.insert("new_condition".into(), name.into());

        // Switch and stamp under one guard so the entry carries its own condition.
        let entry = {
            let mut condition = self.condition.lock().unwrap_or_else(|e| e.into_inner());
            *condition = name.to_string();
            self.entry(configured, condition.clone(), CONDITION_STARTED, payload)
        };
        tracing::debug!(condition = name, "condition set");
        self.record(configured, &entry)
    }

    /// Record an event locally and request a background upload.
    ///
    /// Returns once the entry is on disk. Failures of the archive or queue
    /// append are reported in [`Appended`], not as errors.
    pub fn log_event(&self, name: &str, payload: Payload) -> Result<Appended> {
        let configured = self.configured()?;
        if name.trim().is_empty() {
            return Err(Error::FieldEmpty { field: "event_name" });
        }
        let entry = {
            let condition = self.condition.lock().unwrap_or_else(|e| e.into_inner());
            self.entry(configured, condition.clone(), name, payload)
        };
        self.record(configured, &entry)
    }

    fn entry(&self, configured: &Configured, condition: String, name: &str, payload: Payload) -> LogEntry {
        LogEntry::new(
            configured.config.experiment_id.as_str(),
            configured.config.user_id.as_str(),
            condition,
            name,
            self.clock.now_ms(),
            payload,
        )
    }

    fn record(&self, configured: &Configured, entry: &LogEntry) -> Result<Appended> {
        let appended = configured.store.append(entry)?;
        configured.scheduler.trigger();
        Ok(appended)
    }

    /// Full counterbalancing result for this participant.
    pub fn counterbalance(&self) -> Result<CounterbalanceResult> {
        let config = &self.configured()?.config;
        Ok(aura_core::counterbalance(
            &config.user_id,
            &config.conditions,
            &config.counterbalance,
        )?)
    }

    /// Suggested condition order for this participant.
    pub fn order(&self) -> Result<Vec<String>> {
        Ok(self.counterbalance()?.order)
    }

    pub fn counterbalance_summary(&self) -> Result<String> {
        let config = &self.configured()?.config;
        let result = self.counterbalance()?;
        Ok(result.summary(&config.user_id, &config.conditions))
    }

    /// Distinct conditions this participant has started, per the remote store.
    pub async fn completed_conditions(&self) -> Result<Vec<String>> {
        let configured = self.configured()?;
        let config = &configured.config;
        let mut query = MangoQuery::matching([
            ("user_id", config.user_id.as_str()),
            ("experiment_id", config.experiment_id.as_str()),
            ("event_name", CONDITION_STARTED),
        ])
        .with_fields(&["condition", "timestamp"])
        .with_limit(COMPLETED_PAGE_SIZE);

        let mut completed: Vec<String> = Vec::new();
        let mut pages = 0;
        loop {
            let page = configured.remote.query(&query).await?;
            pages += 1;
            let full = page.docs.len() >= COMPLETED_PAGE_SIZE as usize;
            for condition in page.docs.into_iter().filter_map(|d| d.condition) {
                if !completed.contains(&condition) {
                    completed.push(condition);
                }
            }
            match page.bookmark {
                Some(bookmark) if full && query.bookmark.as_ref() != Some(&bookmark) => {
                    query.bookmark = Some(bookmark);
                }
                _ => break,
            }
        }
        tracing::debug!(?completed, pages, "fetched completed conditions");
        Ok(completed)
    }

    /// Local order minus the conditions already started on the server.
    ///
    /// Falls back to the full local order if the server cannot be queried.
    pub async fn server_aware_order(&self) -> Result<Vec<String>> {
        let order = self.order()?;
        match self.completed_conditions().await {
            Ok(completed) => {
                let remaining: Vec<String> = order
                    .into_iter()
                    .filter(|c| !completed.contains(c))
                    .collect();
                if remaining.is_empty() {
                    tracing::info!("participant has completed all conditions");
                }
                Ok(remaining)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch server state; using local order");
                Ok(order)
            }
        }
    }

    /// Run a Mango query given as JSON text.
    pub async fn raw_query(&self, json: &str) -> Result<FindResponse> {
        let configured = self.configured()?;
        let query = MangoQuery::from_json(json).map_err(|e| Error::InvalidQuery(e.to_string()))?;
        Ok(configured.remote.query(&query).await?)
    }

    /// Drain the queue once, inline.
    pub async fn sync_now(&self) -> Result<DrainReport> {
        Ok(self.configured()?.scheduler.run_now().await)
    }

    pub fn sync_state(&self) -> Result<Arc<SharedSyncState>> {
        Ok(Arc::clone(self.configured()?.scheduler.state()))
    }

    /// Entries on disk not yet confirmed by the remote store.
    pub fn pending_entries(&self) -> Result<usize> {
        self.configured()?.store.queue().pending_entries()
    }

    /// Stop the background sync task. Queued entries stay on disk.
    pub async fn shutdown(&self) -> Result<()> {
        self.configured()?.scheduler.shutdown().await;
        tracing::debug!("session shut down");
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
