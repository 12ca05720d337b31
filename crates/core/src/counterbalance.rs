// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Counterbalancing of experimental condition orders.
//!
//! Assigns each participant an ordered sequence of conditions so that
//! ordering effects cancel out across the participant pool. The assignment
//! is a pure function of the participant id, the condition list, and the
//! [`CounterbalanceConfig`]: the same inputs always produce the same order,
//! including in [`CounterbalanceMode::Random`], which seeds its generator
//! from the participant.
//!
//! Start/end pins are applied after the mode has produced its order. The
//! start pin runs first, so when both pins name the same condition it ends
//! up last.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Largest condition count accepted by [`CounterbalanceMode::FullPermutation`]
/// (8! = 40320 orders).
pub const MAX_PERMUTATION_CONDITIONS: usize = 8;

/// Strategy used to assign condition orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterbalanceMode {
    /// Cyclic Latin square rotation (row = participant group).
    #[default]
    LatinSquare,
    /// All n! orderings, cycling through participants.
    FullPermutation,
    /// Shuffle seeded by the participant.
    Random,
    /// Experimenter-supplied order per participant.
    Custom,
    /// Even participants natural order, odd participants reversed.
    Legacy,
}

impl CounterbalanceMode {
    /// Returns the string representation used in config files and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterbalanceMode::LatinSquare => "latin_square",
            CounterbalanceMode::FullPermutation => "full_permutation",
            CounterbalanceMode::Random => "random",
            CounterbalanceMode::Custom => "custom",
            CounterbalanceMode::Legacy => "legacy",
        }
    }
}

impl fmt::Display for CounterbalanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CounterbalanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "latin_square" | "latin" => Ok(CounterbalanceMode::LatinSquare),
            "full_permutation" | "permutation" => Ok(CounterbalanceMode::FullPermutation),
            "random" => Ok(CounterbalanceMode::Random),
            "custom" => Ok(CounterbalanceMode::Custom),
            "legacy" => Ok(CounterbalanceMode::Legacy),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// Counterbalancing settings for an experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterbalanceConfig {
    pub mode: CounterbalanceMode,
    /// Replaces the generated cyclic square in latin_square mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_latin_square: Option<Vec<Vec<String>>>,
    /// Participant key to explicit order, for custom mode. Keys are kept
    /// sorted; numeric participant ids index into the sorted key list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_orders: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_condition: Option<String>,
}

impl CounterbalanceConfig {
    pub fn with_mode(mode: CounterbalanceMode) -> Self {
        CounterbalanceConfig {
            mode,
            ..Default::default()
        }
    }

    /// Checks the supplied tables against the condition list.
    ///
    /// Every custom Latin square row and every custom order must be a
    /// permutation of `conditions`, and custom mode needs `custom_orders`.
    pub fn validate(&self, conditions: &[String]) -> Result<()> {
        ensure_distinct(conditions)?;

        if let Some(square) = &self.custom_latin_square {
            validate_square(square, conditions)?;
        }

        match &self.custom_orders {
            Some(orders) => {
                for (key, order) in orders {
                    if !is_permutation(order, conditions) {
                        return Err(Error::InvalidCustomOrder {
                            key: key.clone(),
                            order: order.clone(),
                        });
                    }
                }
            }
            None if self.mode == CounterbalanceMode::Custom => {
                return Err(Error::MissingCustomOrders)
            }
            None => {}
        }

        if self.mode == CounterbalanceMode::FullPermutation
            && conditions.len() > MAX_PERMUTATION_CONDITIONS
        {
            return Err(Error::TooManyConditions {
                actual: conditions.len(),
                max: MAX_PERMUTATION_CONDITIONS,
            });
        }

        Ok(())
    }
}

/// The order assigned to one participant, plus the table it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterbalanceResult {
    pub order: Vec<String>,
    pub group_index: u64,
    pub mode: CounterbalanceMode,
    /// Number of distinct groups; `None` when unbounded (random mode).
    pub total_groups: Option<usize>,
    pub all_groups: Vec<Vec<String>>,
    /// Custom mode found no order for this participant and used the
    /// declared condition order instead.
    pub fallback: bool,
}

impl CounterbalanceResult {
    fn trivial(conditions: &[String], mode: CounterbalanceMode) -> Self {
        let all_groups = if conditions.is_empty() {
            Vec::new()
        } else {
            vec![conditions.to_vec()]
        };
        CounterbalanceResult {
            order: conditions.to_vec(),
            group_index: 0,
            mode,
            total_groups: Some(conditions.len()),
            all_groups,
            fallback: false,
        }
    }

    /// Renders a human-readable table of the assignment for experimenters.
    pub fn summary(&self, user_id: &str, conditions: &[String]) -> String {
        let mut out = String::new();
        out.push_str("=== Counterbalancing Summary ===\n");
        out.push_str(&format!("Mode: {}\n", self.mode));
        out.push_str(&format!("Conditions: {}\n", conditions.join(", ")));
        out.push_str(&format!(
            "Participant: {} (group {})\n",
            user_id, self.group_index
        ));
        out.push_str(&format!("Order: {}\n", self.order.join(" → ")));
        if self.fallback {
            out.push_str(&format!(
                "Warning: no custom order matches participant '{}'; using declared order\n",
                user_id
            ));
        }
        out.push('\n');
        match self.total_groups {
            Some(n) => out.push_str(&format!("All groups ({} total):\n", n)),
            None => out.push_str("All groups (unbounded, this participant only):\n"),
        }
        for (idx, order) in self.all_groups.iter().enumerate() {
            out.push_str(&format!("  Group {}: {}\n", idx, order.join(" → ")));
        }
        out
    }
}

/// Derives the numeric participant index from a user id.
///
/// Integer ids map to their absolute value; anything else maps to a stable
/// hash (first 8 bytes of SHA-256), so the same id always lands in the same
/// group on every device and run.
pub fn participant_index(user_id: &str) -> u64 {
    if let Ok(n) = user_id.trim().parse::<i64>() {
        return n.unsigned_abs();
    }
    let hash = Sha256::digest(user_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_be_bytes(bytes)
}

/// Builds the cyclic Latin square: row `r`, column `c` is
/// `conditions[(r + c) % n]`.
pub fn latin_square(conditions: &[String]) -> Vec<Vec<String>> {
    let n = conditions.len();
    (0..n)
        .map(|row| (0..n).map(|col| conditions[(row + col) % n].clone()).collect())
        .collect()
}

/// Generates all orderings of `conditions` in a fixed, swap-based order.
///
/// The first permutation is always the declared order.
pub fn permutations(conditions: &[String]) -> Vec<Vec<String>> {
    if conditions.len() <= 1 {
        return vec![conditions.to_vec()];
    }
    let mut work = conditions.to_vec();
    let mut out = Vec::new();
    permute(&mut work, 0, &mut out);
    out
}

fn permute(work: &mut Vec<String>, start: usize, out: &mut Vec<Vec<String>>) {
    if start + 1 >= work.len() {
        out.push(work.clone());
        return;
    }
    for i in start..work.len() {
        work.swap(start, i);
        permute(work, start + 1, out);
        work.swap(start, i);
    }
}

/// Computes the condition order for a participant.
pub fn counterbalance(
    user_id: &str,
    conditions: &[String],
    config: &CounterbalanceConfig,
) -> Result<CounterbalanceResult> {
    ensure_distinct(conditions)?;

    if conditions.len() <= 1 {
        return Ok(CounterbalanceResult::trivial(conditions, config.mode));
    }

    let index = participant_index(user_id);
    let mut result = match config.mode {
        CounterbalanceMode::LatinSquare => latin_square_order(conditions, index, config)?,
        CounterbalanceMode::FullPermutation => full_permutation_order(conditions, index)?,
        CounterbalanceMode::Random => random_order(conditions, index),
        CounterbalanceMode::Custom => custom_order(conditions, user_id, config)?,
        CounterbalanceMode::Legacy => legacy_order(conditions, index),
    };

    apply_pins(&mut result.order, config);
    Ok(result)
}

fn latin_square_order(
    conditions: &[String],
    index: u64,
    config: &CounterbalanceConfig,
) -> Result<CounterbalanceResult> {
    let square = match &config.custom_latin_square {
        Some(square) => {
            validate_square(square, conditions)?;
            square.clone()
        }
        None => latin_square(conditions),
    };
    let group = index % square.len() as u64;

    Ok(CounterbalanceResult {
        order: square[group as usize].clone(),
        group_index: group,
        mode: CounterbalanceMode::LatinSquare,
        total_groups: Some(square.len()),
        all_groups: square,
        fallback: false,
    })
}

fn full_permutation_order(conditions: &[String], index: u64) -> Result<CounterbalanceResult> {
    if conditions.len() > MAX_PERMUTATION_CONDITIONS {
        return Err(Error::TooManyConditions {
            actual: conditions.len(),
            max: MAX_PERMUTATION_CONDITIONS,
        });
    }
    let all = permutations(conditions);
    let group = index % all.len() as u64;

    Ok(CounterbalanceResult {
        order: all[group as usize].clone(),
        group_index: group,
        mode: CounterbalanceMode::FullPermutation,
        total_groups: Some(all.len()),
        all_groups: all,
        fallback: false,
    })
}

fn random_order(conditions: &[String], index: u64) -> CounterbalanceResult {
    let mut rng = ChaCha8Rng::seed_from_u64(index);
    let mut order = conditions.to_vec();
    order.shuffle(&mut rng);

    CounterbalanceResult {
        all_groups: vec![order.clone()],
        order,
        group_index: index,
        mode: CounterbalanceMode::Random,
        total_groups: None,
        fallback: false,
    }
}

fn custom_order(
    conditions: &[String],
    user_id: &str,
    config: &CounterbalanceConfig,
) -> Result<CounterbalanceResult> {
    let orders = config.custom_orders.as_ref().ok_or(Error::MissingCustomOrders)?;
    let keys: Vec<&String> = orders.keys().collect();

    let selected = keys
        .iter()
        .position(|k| k.as_str() == user_id)
        .or_else(|| {
            let n = user_id.trim().parse::<u64>().ok()?;
            (!keys.is_empty()).then(|| (n % keys.len() as u64) as usize)
        });

    let (order, group_index, fallback) = match selected {
        Some(pos) => {
            let key = keys[pos];
            let order = &orders[key];
            if !is_permutation(order, conditions) {
                return Err(Error::InvalidCustomOrder {
                    key: key.clone(),
                    order: order.clone(),
                });
            }
            (order.clone(), pos as u64, false)
        }
        None => {
            tracing::warn!(
                user_id,
                "no custom order for participant, using declared condition order"
            );
            (conditions.to_vec(), 0, true)
        }
    };

    Ok(CounterbalanceResult {
        order,
        group_index,
        mode: CounterbalanceMode::Custom,
        total_groups: Some(orders.len()),
        all_groups: orders.values().cloned().collect(),
        fallback,
    })
}

fn legacy_order(conditions: &[String], index: u64) -> CounterbalanceResult {
    let natural = conditions.to_vec();
    let reversed: Vec<String> = conditions.iter().rev().cloned().collect();
    let group = index % 2;
    let order = if group == 0 {
        natural.clone()
    } else {
        reversed.clone()
    };

    CounterbalanceResult {
        order,
        group_index: group,
        mode: CounterbalanceMode::Legacy,
        total_groups: Some(2),
        all_groups: vec![natural, reversed],
        fallback: false,
    }
}

/// Moves the start condition to the front, then the end condition to the
/// back. Pins naming a condition not in `order` are ignored.
pub fn apply_pins(order: &mut Vec<String>, config: &CounterbalanceConfig) {
    if let Some(start) = &config.start_condition {
        if let Some(pos) = order.iter().position(|c| c == start) {
            let cond = order.remove(pos);
            order.insert(0, cond);
        }
    }
    if let Some(end) = &config.end_condition {
        if let Some(pos) = order.iter().position(|c| c == end) {
            let cond = order.remove(pos);
            order.push(cond);
        }
    }
}

/// Returns true if `order` holds exactly the elements of `conditions`, each
/// with the same multiplicity.
pub fn is_permutation(order: &[String], conditions: &[String]) -> bool {
    if order.len() != conditions.len() {
        return false;
    }
    let mut a: Vec<&String> = order.iter().collect();
    let mut b: Vec<&String> = conditions.iter().collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

fn validate_square(square: &[Vec<String>], conditions: &[String]) -> Result<()> {
    if square.is_empty() {
        return Err(Error::EmptyLatinSquare);
    }
    for (row, order) in square.iter().enumerate() {
        if !is_permutation(order, conditions) {
            return Err(Error::InvalidLatinSquareRow {
                row,
                order: order.clone(),
            });
        }
    }
    Ok(())
}

fn ensure_distinct(conditions: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(conditions.len());
    for cond in conditions {
        if !seen.insert(cond.as_str()) {
            return Err(Error::DuplicateCondition(cond.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "counterbalance_tests.rs"]
mod tests;
