// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! aura-core: Shared library for the aura experiment telemetry client
//!
//! This crate provides the data types and pure algorithms that do not touch
//! the network: the log entry record, JSONL persistence helpers, the clock
//! abstraction, and the counterbalancing engine.

pub mod clock;
pub mod counterbalance;
pub mod entry;
pub mod error;
pub mod jsonl;

pub use clock::{ClockSource, SystemClock};
pub use counterbalance::{
    counterbalance, latin_square, participant_index, permutations, CounterbalanceConfig,
    CounterbalanceMode, CounterbalanceResult,
};
pub use entry::{LogEntry, Payload, CONDITION_STARTED};
pub use error::{Error, Result};
