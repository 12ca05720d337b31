// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync and session tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aura_core::{ClockSource, LogEntry, Payload};

use super::remote::{
    Document, FindResponse, MangoQuery, RemoteClient, RemoteError, RemoteFuture,
};

/// Page size the store uses when a query names no `limit`.
pub const DEFAULT_FIND_LIMIT: usize = 25;

/// Create a test entry for experiment "fitts", user "7".
pub fn make_entry(timestamp: u64) -> LogEntry {
    let mut payload = Payload::new();
    payload.insert("seq".into(), timestamp.into());
    LogEntry::new("fitts", "7", "Small", "tap", timestamp, payload)
}

/// Clock that returns a fixed, settable time.
#[derive(Debug, Default)]
pub struct FixedClock(pub std::sync::atomic::AtomicU64);

impl FixedClock {
    pub fn at(ms: u64) -> Arc<Self> {
        Arc::new(FixedClock(std::sync::atomic::AtomicU64::new(ms)))
    }
}

impl ClockSource for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory remote store double.
#[derive(Default)]
pub struct MockRemote {
    inserted: Mutex<Vec<LogEntry>>,
    queries: Mutex<Vec<MangoQuery>>,
    /// Number of inserts that succeed before every further insert fails.
    fail_after: Mutex<Option<usize>>,
    fail_queries: AtomicBool,
    query_docs: Mutex<Vec<Document>>,
    insert_delay: Mutex<Option<Duration>>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let `n` more inserts succeed, then fail the rest.
    pub fn fail_after(&self, n: usize) {
        *self.fail_after.lock().unwrap() = Some(n);
    }

    pub fn recover(&self) {
        *self.fail_after.lock().unwrap() = None;
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_query_docs(&self, docs: Vec<Document>) {
        *self.query_docs.lock().unwrap() = docs;
    }

    pub fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock().unwrap() = Some(delay);
    }

    pub fn inserted(&self) -> Vec<LogEntry> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<MangoQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Insert calls made, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Largest number of inserts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RemoteClient for MockRemote {
    fn insert<'a>(&'a self, entry: &'a LogEntry) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = *self.insert_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let result = {
                let mut fail_after = self.fail_after.lock().unwrap();
                match fail_after.as_mut() {
                    Some(0) => Err(RemoteError::Http {
                        status: 503,
                        message: "service unavailable".into(),
                    }),
                    Some(n) => {
                        *n -= 1;
                        Ok(())
                    }
                    None => Ok(()),
                }
            };
            if result.is_ok() {
                self.inserted.lock().unwrap().push(entry.clone());
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn query<'a>(&'a self, query: &'a MangoQuery) -> RemoteFuture<'a, FindResponse> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(RemoteError::Network("connection refused".into()));
            }
            // Page like the store: `limit` docs per call, offset carried in the bookmark.
            let docs = self.query_docs.lock().unwrap().clone();
            let start = query
                .bookmark
                .as_deref()
                .and_then(|b| b.parse::<usize>().ok())
                .unwrap_or(0)
                .min(docs.len());
            let limit = query.limit.map_or(DEFAULT_FIND_LIMIT, |l| l as usize);
            let end = (start + limit).min(docs.len());
            Ok(FindResponse {
                docs: docs[start..end].to_vec(),
                bookmark: Some(end.to_string()),
                warning: None,
            })
        })
    }
}
