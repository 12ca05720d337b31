// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::error::{Error, Result};
use crate::sync::{CouchDbClient, FindResponse, MangoQuery, RemoteClient};

use super::{load_config, runtime};

pub fn run(config_path: &Path, query: &str) -> Result<()> {
    let config = load_config(config_path, None)?;
    let query = parse_query(query)?;
    let client = CouchDbClient::new(&config.remote)?;

    let response = runtime()?.block_on(run_impl(&client, &query))?;
    println!("{}", render(&response)?);
    Ok(())
}

pub(crate) fn parse_query(query: &str) -> Result<MangoQuery> {
    MangoQuery::from_json(query).map_err(|e| Error::InvalidQuery(e.to_string()))
}

pub(crate) async fn run_impl(remote: &dyn RemoteClient, query: &MangoQuery) -> Result<FindResponse> {
    let response = remote.query(query).await?;
    if let Some(warning) = &response.warning {
        tracing::warn!(warning = %warning, "remote store warning");
    }
    Ok(response)
}

/// Pretty JSON array of the returned documents.
pub(crate) fn render(response: &FindResponse) -> Result<String> {
    Ok(serde_json::to_string_pretty(&response.docs)?)
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
