// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for aura-core operations.

use thiserror::Error;

/// All possible errors that can occur in aura-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid counterbalance mode: '{0}'\n  hint: valid modes are: latin_square, full_permutation, random, custom, legacy")]
    InvalidMode(String),

    #[error("custom mode requires custom_orders\n  hint: add a [counterbalance.custom_orders] table or pick another mode")]
    MissingCustomOrders,

    #[error("custom order for '{key}' is not a permutation of the conditions: [{}]", order.join(", "))]
    InvalidCustomOrder { key: String, order: Vec<String> },

    #[error("custom latin square row {row} is not a permutation of the conditions: [{}]", order.join(", "))]
    InvalidLatinSquareRow { row: usize, order: Vec<String> },

    #[error("custom latin square has no rows")]
    EmptyLatinSquare,

    #[error("full permutation supports at most {max} conditions, got {actual}\n  hint: use latin_square for larger condition sets")]
    TooManyConditions { actual: usize, max: usize },

    #[error("duplicate condition: '{0}'")]
    DuplicateCondition(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for aura-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
