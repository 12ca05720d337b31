// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for a CouchDB-compatible document store.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use aura_core::LogEntry;

use super::remote::{FindResponse, MangoQuery, RemoteClient, RemoteError, RemoteFuture, RemoteResult};
use crate::config::RemoteConfig;

/// Talks to `{url}/{db}` with HTTP Basic auth.
pub struct CouchDbClient {
    http: reqwest::Client,
    db_url: String,
    auth_header: String,
}

impl CouchDbClient {
    /// Build a client from the remote section of the experiment config.
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        if config.insecure_tls {
            tracing::warn!(
                url = %config.url,
                "TLS certificate validation disabled for remote store; use only against development servers"
            );
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .danger_accept_invalid_certs(config.insecure_tls)
            .user_agent(concat!("aura/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Setup(e.to_string()))?;

        Ok(CouchDbClient {
            http,
            db_url: config.db_url(),
            auth_header: config.auth_header(),
        })
    }

    pub fn db_url(&self) -> &str {
        &self.db_url
    }

    pub fn find_url(&self) -> String {
        format!("{}/_find", self.db_url)
    }

    /// POST a JSON body; any non-2xx status becomes [`RemoteError::Http`].
    async fn post<B>(&self, url: &str, body: &B) -> RemoteResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }
        Ok(response)
    }
}

impl RemoteClient for CouchDbClient {
    fn insert<'a>(&'a self, entry: &'a LogEntry) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            // The 2xx status is the acknowledgement; the body is not needed.
            self.post(&self.db_url, entry).await?;
            Ok(())
        })
    }

    fn query<'a>(&'a self, query: &'a MangoQuery) -> RemoteFuture<'a, FindResponse> {
        Box::pin(async move {
            self.post(&self.find_url(), query)
                .await?
                .json::<FindResponse>()
                .await
                .map_err(map_reqwest_error)
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_decode() {
        RemoteError::InvalidResponse(e.to_string())
    } else {
        RemoteError::Network(e.to_string())
    }
}
