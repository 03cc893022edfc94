//! Candidate end results: ranking, lot decisions and elected states.
//!
//! Shared by majority elections (one candidate list per election) and
//! proportional elections (one candidate list per electoral list).
//!
//! Determinism:
//! - Candidates are kept in canonical ranking order after every change.
//! - Re-ranking after a vote change clears recorded lot decisions; the
//!   tie groups they resolved may no longer exist.

use std::collections::BTreeMap;

use serde::Serialize;

use tally_algo::{
    compute_ranks, tie_groups, validate_lot_decisions, LotDecisionInput, RankInput, TieGroup,
};
use tally_core::determinism::{sort_for_ranking, RankingKey};
use tally_core::events::CandidateLotDecision;
use tally_core::ids::{CandidateId, ListId};
use tally_core::{EngineError, EngineResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateEndResultState {
    Pending,
    Elected,
    NotElected,
    /// Ranked within the mandates but below the absolute majority.
    AbsoluteMajorityNotReached,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateEndResult {
    pub candidate_id: CandidateId,
    pub vote_count: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vote_sources: BTreeMap<ListId, u64>,
    pub rank: u32,
    pub lot_decision_enabled: bool,
    pub lot_decision_required: bool,
    pub lot_decision: bool,
    pub state: CandidateEndResultState,
}

impl CandidateEndResult {
    fn new(candidate_id: CandidateId) -> Self {
        CandidateEndResult {
            candidate_id,
            vote_count: 0,
            vote_sources: BTreeMap::new(),
            rank: 0,
            lot_decision_enabled: false,
            lot_decision_required: false,
            lot_decision: false,
            state: CandidateEndResultState::Pending,
        }
    }
}

/// Fresh, ranked candidate end results for a configured candidate list.
pub(crate) fn new_candidates(ids: &[CandidateId]) -> Vec<CandidateEndResult> {
    let mut candidates: Vec<CandidateEndResult> =
        ids.iter().cloned().map(CandidateEndResult::new).collect();
    rerank(&mut candidates, false);
    candidates
}

pub(crate) fn find_mut<'a>(
    candidates: &'a mut [CandidateEndResult],
    id: &CandidateId,
) -> EngineResult<&'a mut CandidateEndResult> {
    candidates
        .iter_mut()
        .find(|c| &c.candidate_id == id)
        .ok_or_else(|| EngineError::not_found("candidate", id))
}

/// Recompute ranks from vote counts and reorder.
///
/// Undecided ties fall back to id order, so the order depends on the current
/// vote counts and recorded lot decisions only.
pub(crate) fn rerank(candidates: &mut Vec<CandidateEndResult>, lot_decisions_enabled: bool) {
    let inputs: Vec<RankInput<CandidateId>> = candidates
        .iter()
        .map(|c| RankInput {
            id: c.candidate_id.clone(),
            vote_count: c.vote_count,
            // a stored rank only orders a tie it was decided for
            rank: c.lot_decision.then_some(c.rank),
        })
        .collect();
    let ranked = compute_ranks(&inputs, lot_decisions_enabled);

    let mut by_id: BTreeMap<CandidateId, CandidateEndResult> =
        std::mem::take(candidates).into_iter().map(|c| (c.candidate_id.clone(), c)).collect();
    for entry in ranked {
        if let Some(mut c) = by_id.remove(&entry.id) {
            c.rank = entry.rank;
            c.lot_decision_enabled = entry.lot_decision_enabled;
            c.lot_decision_required = false;
            c.lot_decision = false;
            candidates.push(c);
        }
    }
}

/// Where a ranking splits into elected and not elected candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CutLine {
    pub number_of_mandates: u32,
    /// Candidates below it cannot be elected at any rank.
    pub absolute_majority: Option<u64>,
}

impl CutLine {
    pub(crate) fn seats(number_of_mandates: u32) -> Self {
        CutLine { number_of_mandates, absolute_majority: None }
    }

    /// The group straddles the cut and its members can still be elected.
    pub(crate) fn requires_decision<K>(&self, group: &TieGroup<K>) -> bool {
        group.straddles(self.number_of_mandates)
            && self.absolute_majority.map_or(true, |m| group.vote_count >= m)
    }
}

/// Current tie groups, from vote counts alone.
pub(crate) fn current_tie_groups(candidates: &[CandidateEndResult]) -> Vec<TieGroup<CandidateId>> {
    let entries: Vec<(CandidateId, u64)> =
        candidates.iter().map(|c| (c.candidate_id.clone(), c.vote_count)).collect();
    tie_groups(&entries)
}

/// Validate and record a lot decision submission.
///
/// `cut` is `None` while a list has no seats; then no group is required.
/// Resubmitting an identical decision yields an identical state.
pub(crate) fn apply_lot_decisions(
    candidates: &mut [CandidateEndResult],
    cut: Option<CutLine>,
    decisions: &[CandidateLotDecision],
) -> EngineResult<()> {
    if !decisions.is_empty() && !candidates.iter().any(|c| c.lot_decision_enabled) {
        return Err(EngineError::validation("no lot decisions are enabled"));
    }
    for d in decisions {
        if !candidates.iter().any(|c| c.candidate_id == d.candidate_id) {
            return Err(EngineError::not_found("candidate", &d.candidate_id));
        }
    }

    let groups = current_tie_groups(candidates);
    let inputs: Vec<LotDecisionInput<CandidateId>> = decisions
        .iter()
        .map(|d| LotDecisionInput { id: d.candidate_id.clone(), rank: d.rank })
        .collect();
    let accepted = validate_lot_decisions(
        &groups,
        |g| cut.is_some_and(|c| c.requires_decision(g)),
        &inputs,
    )?;

    let group_rank: BTreeMap<&CandidateId, u32> = groups
        .iter()
        .flat_map(|g| g.members.iter().map(move |m| (m, g.min_rank)))
        .collect();
    let updates: Vec<(CandidateId, u32, bool)> = accepted
        .iter()
        .filter_map(|(id, rank)| match rank {
            Some(r) => Some((id.clone(), *r, true)),
            None => group_rank.get(id).map(|&min| (id.clone(), min, false)),
        })
        .collect();
    for (id, rank, decided) in updates {
        let c = find_mut(candidates, &id)?;
        c.rank = rank;
        c.lot_decision = decided;
    }
    sort_for_ranking(candidates, |c| RankingKey {
        vote_count: c.vote_count,
        rank: Some(c.rank),
        id: &c.candidate_id,
    });
    Ok(())
}

/// Flag the members of tie groups that need a lot decision at `cut`.
pub(crate) fn update_lot_decision_required(candidates: &mut [CandidateEndResult], cut: CutLine) {
    let required: Vec<CandidateId> = current_tie_groups(candidates)
        .into_iter()
        .filter(|g| cut.requires_decision(g))
        .flat_map(|g| g.members)
        .collect();
    for c in candidates.iter_mut() {
        c.lot_decision_required = c.lot_decision_enabled && required.contains(&c.candidate_id);
    }
}

/// Elected iff ranked within the mandates and not part of an undecided
/// straddling group. `absolute_majority` demotes elected candidates below it.
pub(crate) fn assign_states(
    candidates: &mut [CandidateEndResult],
    number_of_mandates: u32,
    absolute_majority: Option<u64>,
) {
    for c in candidates.iter_mut() {
        c.state = if c.lot_decision_required && !c.lot_decision {
            CandidateEndResultState::Pending
        } else if c.rank > number_of_mandates {
            CandidateEndResultState::NotElected
        } else if absolute_majority.is_some_and(|m| c.vote_count < m) {
            CandidateEndResultState::AbsoluteMajorityNotReached
        } else {
            CandidateEndResultState::Elected
        };
    }
}

pub(crate) fn reset_states(candidates: &mut [CandidateEndResult]) {
    for c in candidates.iter_mut() {
        c.state = CandidateEndResultState::Pending;
        c.lot_decision_required = false;
    }
}

pub(crate) fn has_open_required_lot_decisions(candidates: &[CandidateEndResult]) -> bool {
    candidates.iter().any(|c| c.lot_decision_required && !c.lot_decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> CandidateId {
        s.parse().unwrap()
    }

    fn abc() -> Vec<CandidateEndResult> {
        let mut c = new_candidates(&[cid("A"), cid("B"), cid("C")]);
        for (id, v) in [("A", 100), ("B", 100), ("C", 80)] {
            find_mut(&mut c, &cid(id)).unwrap().vote_count = v;
        }
        rerank(&mut c, true);
        c
    }

    fn decision(id: &str, rank: Option<u32>) -> CandidateLotDecision {
        CandidateLotDecision { candidate_id: cid(id), rank }
    }

    fn state_of(c: &[CandidateEndResult], id: &str) -> CandidateEndResultState {
        c.iter().find(|x| x.candidate_id.as_str() == id).unwrap().state
    }

    #[test]
    fn straddling_tie_stays_pending_until_decided() {
        let mut c = abc();
        assert_eq!(c.iter().map(|x| x.rank).collect::<Vec<_>>(), vec![1, 1, 3]);
        update_lot_decision_required(&mut c, CutLine::seats(2));
        assign_states(&mut c, 2, None);
        // both tied candidates fit into two mandates
        assert!(!has_open_required_lot_decisions(&c));
        assert_eq!(state_of(&c, "A"), CandidateEndResultState::Elected);

        update_lot_decision_required(&mut c, CutLine::seats(1));
        assign_states(&mut c, 1, None);
        assert!(has_open_required_lot_decisions(&c));
        assert_eq!(state_of(&c, "A"), CandidateEndResultState::Pending);
        assert_eq!(state_of(&c, "C"), CandidateEndResultState::NotElected);

        apply_lot_decisions(&mut c, Some(CutLine::seats(1)), &[decision("A", Some(2)), decision("B", Some(1))])
            .unwrap();
        assign_states(&mut c, 1, None);
        assert!(!has_open_required_lot_decisions(&c));
        assert_eq!(state_of(&c, "B"), CandidateEndResultState::Elected);
        assert_eq!(state_of(&c, "A"), CandidateEndResultState::NotElected);
        assert_eq!(c[0].candidate_id.as_str(), "B");
    }

    #[test]
    fn resubmission_is_idempotent() {
        let mut c = abc();
        update_lot_decision_required(&mut c, CutLine::seats(1));
        let ds = [decision("A", Some(1)), decision("B", Some(2))];
        apply_lot_decisions(&mut c, Some(CutLine::seats(1)), &ds).unwrap();
        assign_states(&mut c, 1, None);
        let once = c.clone();
        apply_lot_decisions(&mut c, Some(CutLine::seats(1)), &ds).unwrap();
        assign_states(&mut c, 1, None);
        assert_eq!(c, once);
    }

    #[test]
    fn undecided_submission_restores_group_rank() {
        let mut c = abc();
        apply_lot_decisions(&mut c, None, &[decision("A", Some(2)), decision("B", Some(1))])
            .unwrap();
        apply_lot_decisions(&mut c, None, &[decision("A", None), decision("B", None)]).unwrap();
        assert!(c.iter().filter(|x| x.vote_count == 100).all(|x| x.rank == 1 && !x.lot_decision));
    }

    #[test]
    fn rejected_submission_changes_nothing() {
        let mut c = abc();
        let before = c.clone();
        let err = apply_lot_decisions(&mut c, Some(CutLine::seats(2)), &[decision("A", Some(1)), decision("B", Some(1))])
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        let err = apply_lot_decisions(&mut c, Some(CutLine::seats(2)), &[decision("Z", Some(1))]).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn lot_decisions_need_enabled_groups() {
        let mut c = new_candidates(&[cid("A"), cid("B")]);
        let err = apply_lot_decisions(&mut c, None, &[decision("A", Some(1))]).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn absolute_majority_demotes() {
        let mut c = abc();
        update_lot_decision_required(&mut c, CutLine::seats(2));
        assign_states(&mut c, 2, Some(101));
        assert_eq!(state_of(&c, "A"), CandidateEndResultState::AbsoluteMajorityNotReached);
        assert_eq!(state_of(&c, "C"), CandidateEndResultState::NotElected);
    }

    #[test]
    fn rerank_clears_lot_decisions() {
        let mut c = abc();
        apply_lot_decisions(&mut c, None, &[decision("A", Some(2)), decision("B", Some(1))])
            .unwrap();
        rerank(&mut c, true);
        assert!(c.iter().all(|x| !x.lot_decision));
        assert_eq!(c.iter().map(|x| x.rank).collect::<Vec<_>>(), vec![1, 1, 3]);
    }

    #[test]
    fn rerank_order_follows_votes_not_history() {
        let mut c = new_candidates(&[cid("A"), cid("B"), cid("C")]);
        let fresh = c.clone();
        find_mut(&mut c, &cid("C")).unwrap().vote_count = 1;
        rerank(&mut c, true);
        assert_eq!(c[0].candidate_id.as_str(), "C");
        find_mut(&mut c, &cid("C")).unwrap().vote_count = 0;
        rerank(&mut c, false);
        assert_eq!(c, fresh);
    }

    #[test]
    fn decided_order_survives_one_rerank_only() {
        let mut c = abc();
        apply_lot_decisions(&mut c, Some(CutLine::seats(1)), &[decision("A", Some(2)), decision("B", Some(1))])
            .unwrap();
        rerank(&mut c, true);
        assert_eq!(c[0].candidate_id.as_str(), "B");
        rerank(&mut c, true);
        assert_eq!(c[0].candidate_id.as_str(), "A");
    }
}
