// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::config::ExperimentConfig;
use crate::error::Result;

use super::load_config;

pub fn run(config_path: &Path, user: Option<&str>) -> Result<()> {
    let config = load_config(config_path, user)?;
    print!("{}", render_order(&config)?);
    Ok(())
}

pub fn run_summary(config_path: &Path, user: Option<&str>) -> Result<()> {
    let config = load_config(config_path, user)?;
    print!("{}", render_summary(&config)?);
    Ok(())
}

/// One condition per line.
pub(crate) fn render_order(config: &ExperimentConfig) -> Result<String> {
    let result = aura_core::counterbalance(&config.user_id, &config.conditions, &config.counterbalance)?;
    let mut out = String::new();
    for condition in &result.order {
        out.push_str(condition);
        out.push('\n');
    }
    Ok(out)
}

pub(crate) fn render_summary(config: &ExperimentConfig) -> Result<String> {
    let result = aura_core::counterbalance(&config.user_id, &config.conditions, &config.counterbalance)?;
    Ok(result.summary(&config.user_id, &config.conditions))
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
