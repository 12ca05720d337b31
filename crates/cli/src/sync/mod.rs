// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Upload of queued log entries to the remote document store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Scheduler  │────►│   Worker    │────►│   Remote    │
//! │ (one task)  │     │  (drain)    │     │  (trait)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │
//!        │ trigger           ▼
//! ┌─────────────┐     ┌─────────────┐
//! │   Session   │────►│   Queue     │  (sealed JSONL files)
//! │ (log_event) │     │ (QueueDir)  │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Features
//!
//! - File-at-a-time upload; a file is deleted only once every line is acknowledged
//! - At-least-once delivery: an interrupted file is re-sent in full
//! - Linear backoff between failed drains, coalesced triggers
//! - Injectable remote client trait for testing

mod couchdb;
mod remote;
mod scheduler;
mod worker;

pub use couchdb::CouchDbClient;
pub use remote::{
    Document, FindResponse, MangoQuery, RemoteClient, RemoteError, RemoteFuture, RemoteResult,
};
pub use scheduler::{
    BackoffPolicy, SharedSyncState, SyncScheduler, STATE_BACKING_OFF, STATE_IDLE, STATE_RUNNING,
    STATE_STOPPED,
};
pub use worker::{
    DrainOutcome, DrainReport, MalformedLinePolicy, SyncOptions, SyncWorker, UploadFailure,
};

#[cfg(test)]
pub(crate) mod test_helpers;



#[cfg(test)]
mod scheduler_tests;
