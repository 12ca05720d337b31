// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote document store abstraction.
//!
//! Provides a trait-based client so that:
//! - production sessions talk to a CouchDB-compatible store over HTTP
//! - tests drive the sync worker against an in-memory double

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use aura_core::LogEntry;

/// Error type for remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The store answered with a non-success status.
    #[error("remote store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request did not complete within the client timeout.
    #[error("request to remote store timed out")]
    Timeout,

    /// The store could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The store answered with a body we could not decode.
    #[error("invalid response from remote store: {0}")]
    InvalidResponse(String),

    /// The client could not be constructed.
    #[error("failed to set up remote client: {0}")]
    Setup(String),
}

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteClient`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Client for the remote document store.
///
/// The database name and credentials are fixed when the client is built.
pub trait RemoteClient: Send + Sync {
    /// Insert one log entry as a new document.
    fn insert<'a>(&'a self, entry: &'a LogEntry) -> RemoteFuture<'a, ()>;

    /// Run a Mango query against the database.
    fn query<'a>(&'a self, query: &'a MangoQuery) -> RemoteFuture<'a, FindResponse>;
}

/// Body of a `_find` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MangoQuery {
    #[serde(default)]
    pub selector: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<BTreeMap<String, String>>>,
    /// Resume after the page that returned this bookmark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
}

impl MangoQuery {
    /// Query matching documents whose fields equal the given values.
    pub fn matching<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let selector = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        MangoQuery {
            selector,
            ..MangoQuery::default()
        }
    }

    /// Restrict returned documents to the named fields.
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Decode a query from its JSON text.
    ///
    /// A missing `selector` matches every document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A document returned by a query.
///
/// Fields are optional since queries may project a subset of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

/// Response of a `_find` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub docs: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
