// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Port 9 (discard) is closed on test machines, so uploads fail fast.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

pub fn aura() -> Command {
    let mut cmd = cargo_bin_cmd!("aura");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Write an experiment config into `dir` and return its path.
pub fn write_config(dir: &Path, user_id: &str, extra: &str) -> PathBuf {
    let path = dir.join("experiment.toml");
    let content = format!(
        r#"experiment_id = "fitts"
user_id = "{user_id}"
conditions = ["Small", "Medium", "Large"]

[remote]
url = "{UNREACHABLE_URL}"
db_name = "aura"
username = "lab"
password = "secret"
request_timeout_secs = 2

{extra}
"#
    );
    std::fs::write(&path, content).unwrap();
    path
}

/// Temp dir with a config for participant "2" and a data dir beside it.
pub fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "2", "");
    let data = temp.path().join("data");
    (temp, config, data)
}
