//! Lot decision validation.
//!
//! Contract:
//! - Every candidate appears at most once and must belong to a tie group.
//! - A group that is touched must be submitted completely; a required group
//!   (as marked by the caller's predicate) must always be submitted.
//! - Within one group either every member carries a rank or none does; a
//!   required group must carry ranks.
//! - Ranks lie in `[min_rank, max_rank]` of their group and are unique across
//!   the whole submission.
//!
//! Validation is all-or-nothing: the caller applies the returned map only on
//! `Ok`, so a rejected submission never leaves partial state behind.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use tally_core::{EngineError, EngineResult};

use crate::rank::TieGroup;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotDecisionInput<K> {
    pub id: K,
    /// `None` keeps the member's group undecided.
    pub rank: Option<u32>,
}

/// Validate `decisions` against the current tie groups.
///
/// `is_required` marks the groups that must be decided, usually the ones
/// straddling the mandate cut line (see [`TieGroup::straddles`]).
/// Returns the accepted `id → rank` assignments.
pub fn validate_lot_decisions<K, F>(
    groups: &[TieGroup<K>],
    is_required: F,
    decisions: &[LotDecisionInput<K>],
) -> EngineResult<BTreeMap<K, Option<u32>>>
where
    K: Ord + Clone + Display,
    F: Fn(&TieGroup<K>) -> bool,
{
    let mut submitted: BTreeMap<K, Option<u32>> = BTreeMap::new();
    for d in decisions {
        if submitted.insert(d.id.clone(), d.rank).is_some() {
            return Err(EngineError::validation(format!(
                "duplicate lot decision for {}",
                d.id
            )));
        }
    }

    let mut group_of: BTreeMap<&K, usize> = BTreeMap::new();
    for (gi, g) in groups.iter().enumerate() {
        for m in &g.members {
            group_of.insert(m, gi);
        }
    }
    if let Some(stray) = submitted.keys().find(|k| !group_of.contains_key(k)) {
        return Err(EngineError::validation(format!(
            "{stray} is not part of any tie group"
        )));
    }

    let mut taken: BTreeSet<u32> = BTreeSet::new();
    for g in groups {
        let present = g.members.iter().filter(|m| submitted.contains_key(*m)).count();
        let required = is_required(g);

        if present == 0 {
            if required {
                return Err(EngineError::validation(format!(
                    "lot decision required for tie group with {} votes",
                    g.vote_count
                )));
            }
            continue;
        }
        if present != g.members.len() {
            return Err(EngineError::validation(format!(
                "tie group with {} votes submitted partially ({present} of {} candidates)",
                g.vote_count,
                g.members.len()
            )));
        }

        let ranked = g.members.iter().filter(|m| submitted[*m].is_some()).count();
        if ranked != 0 && ranked != g.members.len() {
            return Err(EngineError::validation(format!(
                "tie group with {} votes is partially decided",
                g.vote_count
            )));
        }
        if ranked == 0 && required {
            return Err(EngineError::validation(format!(
                "tie group with {} votes straddles the mandates and must be decided",
                g.vote_count
            )));
        }

        for m in &g.members {
            let Some(rank) = submitted[m] else { continue };
            if rank < g.min_rank || rank > g.max_rank() {
                return Err(EngineError::validation(format!(
                    "rank {rank} for {m} outside [{}, {}] of tie group with {} votes",
                    g.min_rank,
                    g.max_rank(),
                    g.vote_count
                )));
            }
            if !taken.insert(rank) {
                return Err(EngineError::validation(format!(
                    "rank {rank} assigned twice in tie group with {} votes",
                    g.vote_count
                )));
            }
        }
    }

    Ok(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::tie_groups;

    fn groups() -> Vec<TieGroup<String>> {
        tie_groups(&[("A".to_string(), 100), ("B".to_string(), 100), ("C".to_string(), 80)])
    }

    fn cut(n: u32) -> impl Fn(&TieGroup<String>) -> bool {
        move |g| g.straddles(n)
    }

    fn d(id: &str, rank: Option<u32>) -> LotDecisionInput<String> {
        LotDecisionInput { id: id.to_string(), rank }
    }

    #[test]
    fn accepts_both_orders() {
        let g = groups();
        let ok = validate_lot_decisions(&g, cut(2), &[d("A", Some(1)), d("B", Some(2))]).unwrap();
        assert_eq!(ok["A"], Some(1));
        let ok = validate_lot_decisions(&g, cut(2), &[d("A", Some(2)), d("B", Some(1))]).unwrap();
        assert_eq!(ok["B"], Some(1));
    }

    #[test]
    fn rejects_rank_collision() {
        let err = validate_lot_decisions(&groups(), cut(2), &[d("A", Some(1)), d("B", Some(1))])
            .unwrap_err();
        assert!(err.to_string().contains("assigned twice"), "{err}");
    }

    #[test]
    fn rejects_out_of_window_and_strays() {
        let g = groups();
        assert!(validate_lot_decisions(&g, cut(2), &[d("A", Some(1)), d("B", Some(3))]).is_err());
        assert!(validate_lot_decisions(&g, cut(2), &[d("C", Some(3))]).is_err());
        assert!(validate_lot_decisions(&g, cut(2), &[d("A", Some(1)), d("A", Some(2))]).is_err());
    }

    #[test]
    fn rejects_partial_group_and_mixed_ranks() {
        let g = groups();
        assert!(validate_lot_decisions(&g, cut(2), &[d("A", Some(1))]).is_err());
        assert!(validate_lot_decisions(&g, cut(2), &[d("A", Some(1)), d("B", None)]).is_err());
    }

    #[test]
    fn straddling_group_is_required() {
        let err = validate_lot_decisions(&groups(), cut(1), &[]).unwrap_err();
        assert!(err.to_string().contains("required"), "{err}");
        // Not straddling with two mandates: nothing required.
        assert!(validate_lot_decisions(&groups(), cut(2), &[]).unwrap().is_empty());
    }

    #[test]
    fn undecided_group_only_below_or_above_the_cut() {
        let err = validate_lot_decisions(&groups(), cut(1), &[d("A", None), d("B", None)])
            .unwrap_err();
        assert!(err.to_string().contains("must be decided"), "{err}");
        let ok = validate_lot_decisions(&groups(), cut(2), &[d("A", None), d("B", None)]).unwrap();
        assert!(ok.values().all(Option::is_none));
        // no cut line yet (list without seats)
        let nothing_required = |_: &TieGroup<String>| false;
        assert!(validate_lot_decisions(&groups(), nothing_required, &[d("A", None), d("B", None)]).is_ok());
    }
}
