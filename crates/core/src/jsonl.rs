// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Provides durable append-only storage for JSON-serializable records.
//! Each record is stored as a single JSON line with fsync for durability.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Serializes a record to its single-line JSON form (without the newline).
pub fn to_line<T: Serialize>(record: &T) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Appends a pre-serialized line to a JSONL file with fsync for durability.
///
/// The line must not contain a newline; one is added.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    // Single write so a concurrent reader never sees half a record.
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes())?;
    file.sync_all()?;

    Ok(())
}

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    append_line(path, &to_line(record)?)
}

/// Reads the non-blank lines of a JSONL file, paired with their 1-based
/// line numbers.
///
/// Returns an empty vec if the file doesn't exist.
pub fn read_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut lines = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        lines.push((idx + 1, line));
    }

    Ok(lines)
}

/// Reads all records from a JSONL file.
///
/// Skips empty lines and returns an empty vec if the file doesn't exist.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    read_lines(path)?
        .into_iter()
        .map(|(_, line)| Ok(serde_json::from_str(&line)?))
        .collect()
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
