//! Signed delta arithmetic on end-result subtotals.
//!
//! Every subtotal is `u64`; a delta that would take one below zero (or past
//! `u64::MAX`) means the caller retracted something it never applied. That is
//! a defect, so it surfaces as `InvariantViolation` and is logged.

use std::collections::BTreeMap;

use tracing::error;

use tally_core::entities::{CountOfVoters, DeltaFactor, VotingCards};
use tally_core::{EngineError, EngineResult};

/// `total += factor × value`, checked.
pub(crate) fn apply_count(
    total: &mut u64,
    value: u64,
    factor: DeltaFactor,
    what: &str,
) -> EngineResult<()> {
    let next = match factor {
        DeltaFactor::Add => total.checked_add(value),
        DeltaFactor::Remove => total.checked_sub(value),
    };
    match next {
        Some(v) => {
            *total = v;
            Ok(())
        }
        None => {
            let msg = format!(
                "{what}: {total} {} {value} leaves the counter range",
                if factor == DeltaFactor::Add { "+" } else { "-" }
            );
            error!(target: "tally::invariant", "{msg}");
            Err(EngineError::invariant(msg))
        }
    }
}

/// Keyed variant; entries that drop back to zero are removed so a retraction
/// restores the map exactly.
pub(crate) fn apply_keyed_count<K: Ord + Clone + std::fmt::Display>(
    totals: &mut BTreeMap<K, u64>,
    key: &K,
    value: u64,
    factor: DeltaFactor,
    what: &str,
) -> EngineResult<()> {
    let mut current = totals.get(key).copied().unwrap_or(0);
    apply_count(&mut current, value, factor, &format!("{what} {key}"))?;
    if current == 0 {
        totals.remove(key);
    } else {
        totals.insert(key.clone(), current);
    }
    Ok(())
}

pub(crate) fn apply_count_of_voters(
    total: &mut CountOfVoters,
    delta: &CountOfVoters,
    factor: DeltaFactor,
) -> EngineResult<()> {
    apply_count(&mut total.received_ballots, delta.received_ballots, factor, "received ballots")?;
    apply_count(&mut total.invalid_ballots, delta.invalid_ballots, factor, "invalid ballots")?;
    apply_count(&mut total.blank_ballots, delta.blank_ballots, factor, "blank ballots")?;
    apply_count(&mut total.accounted_ballots, delta.accounted_ballots, factor, "accounted ballots")
}

pub(crate) fn apply_voting_cards(
    total: &mut VotingCards,
    delta: &VotingCards,
    factor: DeltaFactor,
) -> EngineResult<()> {
    apply_count(&mut total.valid, delta.valid, factor, "valid voting cards")?;
    apply_count(&mut total.invalid, delta.invalid, factor, "invalid voting cards")
}
