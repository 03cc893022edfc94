//! EndResultSet: every end result of a contest, and the event router.
//!
//! `apply` is a pure `(state, event) -> state` step: the event runs against a
//! working copy that replaces the committed state only on success, so a
//! rejected event never leaves partial changes behind.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, error, info};

use tally_core::entities::{CountingCircleResultSnapshot, PoliticalBusinessConfig};
use tally_core::events::EndResultEvent;
use tally_core::ids::PoliticalBusinessId;
use tally_core::variables::EngineParams;
use tally_core::{EngineError, EngineResult};

use crate::lifecycle::{EndResult, FinalizationContext, PoliticalBusinessEndResult};
use crate::lot_decisions::AvailableLotDecisions;
use crate::majority::MajorityElectionEndResult;
use crate::proportional::ProportionalElectionEndResult;
use crate::union::ProportionalElectionUnionEndResult;
use crate::vote::VoteEndResult;

type EndResults = BTreeMap<PoliticalBusinessId, EndResult>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndResultSet {
    params: EngineParams,
    configs: BTreeMap<PoliticalBusinessId, PoliticalBusinessConfig>,
    end_results: EndResults,
    /// member election → union
    union_of: BTreeMap<PoliticalBusinessId, PoliticalBusinessId>,
}

/// Serializable view of the whole set, in id order.
#[derive(Debug, Serialize)]
pub struct EndResultSetSnapshot<'a> {
    pub params: &'a EngineParams,
    pub end_results: Vec<&'a EndResult>,
    pub available_lot_decisions: Vec<AvailableLotDecisions>,
}

fn fresh_end_result(cfg: &PoliticalBusinessConfig) -> EndResult {
    match cfg {
        PoliticalBusinessConfig::Vote(c) => EndResult::Vote(VoteEndResult::new(c)),
        PoliticalBusinessConfig::MajorityElection(c) => {
            EndResult::MajorityElection(MajorityElectionEndResult::new(c))
        }
        PoliticalBusinessConfig::ProportionalElection(c) => {
            EndResult::ProportionalElection(ProportionalElectionEndResult::new(c))
        }
        PoliticalBusinessConfig::ProportionalElectionUnion(c) => {
            EndResult::ProportionalElectionUnion(ProportionalElectionUnionEndResult::new(c))
        }
    }
}

impl EndResultSet {
    pub fn new(params: EngineParams, configs: Vec<PoliticalBusinessConfig>) -> EngineResult<Self> {
        let mut by_id = BTreeMap::new();
        for cfg in configs {
            let id = cfg.id().clone();
            if by_id.insert(id.clone(), cfg).is_some() {
                return Err(EngineError::validation(format!("duplicate political business {id}")));
            }
        }

        for cfg in by_id.values() {
            let PoliticalBusinessConfig::ProportionalElection(pe) = cfg else { continue };
            if let Some(l) = pe.lists.iter().find(|l| l.sub_list_union.is_some() && l.list_union.is_none()) {
                return Err(EngineError::validation(format!(
                    "list {} of {} has a sub-list union but no list union",
                    l.id, pe.id
                )));
            }
        }

        let mut union_of = BTreeMap::new();
        for cfg in by_id.values() {
            let PoliticalBusinessConfig::ProportionalElectionUnion(u) = cfg else { continue };
            for member in &u.election_ids {
                let Some(PoliticalBusinessConfig::ProportionalElection(pe)) = by_id.get(member) else {
                    return Err(EngineError::not_found("proportional election", member));
                };
                if pe.mandate_algorithm.triggers_automatically() {
                    return Err(EngineError::validation(format!(
                        "{member} is not a union double proportional election"
                    )));
                }
                let mut seen = BTreeSet::new();
                if let Some(dup) = pe.lists.iter().filter_map(|l| l.union_list.as_ref()).find(|x| !seen.insert(*x)) {
                    return Err(EngineError::validation(format!(
                        "union list {dup} appears twice in {member}"
                    )));
                }
                if let Some(other) = union_of.insert(member.clone(), u.id.clone()) {
                    return Err(EngineError::validation(format!(
                        "{member} belongs to unions {other} and {}",
                        u.id
                    )));
                }
            }
        }

        let end_results = by_id.iter().map(|(id, cfg)| (id.clone(), fresh_end_result(cfg))).collect();
        Ok(EndResultSet { params, configs: by_id, end_results, union_of })
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn get(&self, id: &PoliticalBusinessId) -> EngineResult<&EndResult> {
        self.end_results.get(id).ok_or_else(|| EngineError::not_found("end result", id))
    }

    pub fn end_results(&self) -> impl Iterator<Item = &EndResult> {
        self.end_results.values()
    }

    pub fn available_lot_decisions(&self, id: &PoliticalBusinessId) -> EngineResult<AvailableLotDecisions> {
        Ok(self.get(id)?.available_lot_decisions())
    }

    pub fn snapshot(&self) -> EndResultSetSnapshot<'_> {
        EndResultSetSnapshot {
            params: &self.params,
            end_results: self.end_results.values().collect(),
            available_lot_decisions: self
                .end_results
                .values()
                .map(|e| e.available_lot_decisions())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    /// Apply one event; on error the set is unchanged.
    pub fn apply(&mut self, event: &EndResultEvent) -> EngineResult<()> {
        let id = event.political_business_id();
        debug!(event = event.name(), political_business = %id, "apply");
        let mut next = self.end_results.clone();
        match self.route(&mut next, event) {
            Ok(()) => {
                self.end_results = next;
                Ok(())
            }
            Err(e) => {
                if e.is_invariant_violation() {
                    error!(event = event.name(), political_business = %id, error = %e, "event aborted");
                } else {
                    debug!(event = event.name(), political_business = %id, error = %e, "event rejected");
                }
                Err(e)
            }
        }
    }

    /// Apply events in order, stopping at the first failure (index, error).
    pub fn apply_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a EndResultEvent>,
    ) -> Result<usize, (usize, EngineError)> {
        let mut applied = 0usize;
        for (i, ev) in events.into_iter().enumerate() {
            self.apply(ev).map_err(|e| (i, e))?;
            applied += 1;
        }
        Ok(applied)
    }

    fn route(&self, next: &mut EndResults, event: &EndResultEvent) -> EngineResult<()> {
        use EndResultEvent::*;

        let id = event.political_business_id();
        let params = &self.params;
        let is_union = match next.get(id) {
            Some(e) => matches!(e, EndResult::ProportionalElectionUnion(_)),
            None => return Err(EngineError::not_found("end result", id)),
        };

        match event {
            CountingCircleResultApplied { counting_circle_id, factor, done_state_changed, result, .. } => {
                debug!(counting_circle = %counting_circle_id, "counting circle result");
                match (entry_mut(next, id)?, result) {
                    (EndResult::Vote(e), CountingCircleResultSnapshot::Vote(r)) => {
                        e.apply_counting_circle_result(r, *factor, *done_state_changed)?
                    }
                    (EndResult::MajorityElection(e), CountingCircleResultSnapshot::MajorityElection(r)) => {
                        e.apply_counting_circle_result(r, *factor, *done_state_changed)?
                    }
                    (
                        EndResult::ProportionalElection(e),
                        CountingCircleResultSnapshot::ProportionalElection(r),
                    ) => e.apply_counting_circle_result(r, *factor, *done_state_changed, params)?,
                    (e, _) => {
                        return Err(EngineError::validation(format!(
                            "result kind does not match {} {id}",
                            e.kind()
                        )))
                    }
                }
                match self.union_of.get(id) {
                    Some(union_id) => self.with_union(next, union_id, |u, members| u.invalidate(members)),
                    None => Ok(()),
                }
            }

            LotDecisionsSubmitted { list_id, decisions, .. } => match (entry_mut(next, id)?, list_id) {
                (EndResult::MajorityElection(e), None) => e.submit_lot_decisions(decisions),
                (EndResult::ProportionalElection(e), Some(list_id)) => {
                    e.submit_lot_decisions(list_id, decisions)
                }
                (EndResult::MajorityElection(_), Some(_)) => {
                    Err(EngineError::validation("majority election lot decisions take no list"))
                }
                (EndResult::ProportionalElection(_), None) => {
                    Err(EngineError::validation("proportional election lot decisions need a list"))
                }
                (e, _) => Err(EngineError::validation(format!("{} has no candidate lot decisions", e.kind()))),
            },

            MandateDistributionTriggered { .. } if is_union => {
                self.with_union(next, id, |u, members| u.trigger_mandate_distribution(members, params))
            }
            MandateDistributionTriggered { .. } => match entry_mut(next, id)? {
                EndResult::ProportionalElection(e) => e.trigger_mandate_distribution(params),
                e => Err(EngineError::validation(format!("{} has no mandate distribution", e.kind()))),
            },

            MandateDistributionReverted { .. } if is_union => {
                self.with_union(next, id, |u, members| u.revert_mandate_distribution(members))
            }
            MandateDistributionReverted { .. } => match entry_mut(next, id)? {
                EndResult::ProportionalElection(e) => e.revert_mandate_distribution(),
                e => Err(EngineError::validation(format!("{} has no mandate distribution", e.kind()))),
            },

            SuperApportionmentLotDecisionSubmitted { number, .. } if is_union => {
                self.with_union(next, id, |u, members| {
                    u.submit_super_apportionment_lot_decision(*number, members, params)
                })
            }
            SuperApportionmentLotDecisionSubmitted { number, .. } => match entry_mut(next, id)? {
                EndResult::ProportionalElection(e) => e.submit_super_apportionment_lot_decision(*number, params),
                e => Err(EngineError::validation(format!("{} has no apportionment lot decisions", e.kind()))),
            },

            SubApportionmentLotDecisionSubmitted { number, .. } if is_union => {
                self.with_union(next, id, |u, members| {
                    u.submit_sub_apportionment_lot_decision(*number, members)
                })
            }
            SubApportionmentLotDecisionSubmitted { number, .. } => match entry_mut(next, id)? {
                EndResult::ProportionalElection(e) => e.submit_sub_apportionment_lot_decision(*number),
                e => Err(EngineError::validation(format!("{} has no apportionment lot decisions", e.kind()))),
            },

            ManualEndResultEntered { candidates, .. } => match entry_mut(next, id)? {
                EndResult::ProportionalElection(e) => e.enter_manual_end_result(candidates),
                e => Err(EngineError::validation(format!("{} has no manual end result", e.kind()))),
            },

            Finalized { .. } => {
                let ctx = FinalizationContext {
                    union_distributed: self.union_of.get(id).map(|union_id| {
                        matches!(
                            next.get(union_id),
                            Some(EndResult::ProportionalElectionUnion(u)) if u.is_distributed()
                        )
                    }),
                };
                entry_mut(next, id)?.finalize(ctx)
            }

            FinalizationReverted { .. } => entry_mut(next, id)?.revert_finalization(),

            EndResultReset { .. } => self.reset(next, id, is_union),
        }
    }

    fn reset(&self, next: &mut EndResults, id: &PoliticalBusinessId, is_union: bool) -> EngineResult<()> {
        let cfg = self.configs.get(id).ok_or_else(|| EngineError::not_found("political business", id))?;
        if entry_mut(next, id)?.is_finalized() {
            return Err(EngineError::validation("a finalized end result cannot be reset"));
        }
        if let Some(union_id) = self.union_of.get(id) {
            self.with_union(next, union_id, |u, members| u.invalidate(members))?;
        }
        if is_union {
            self.with_union(next, id, |u, members| {
                if let Some(m) = members.iter().find(|m| m.progress.finalized) {
                    return Err(EngineError::validation(format!(
                        "member election {} is finalized",
                        m.political_business_id
                    )));
                }
                u.invalidate(members)
            })?;
        }
        next.insert(id.clone(), fresh_end_result(cfg));
        info!(political_business = %id, "end result reset");
        Ok(())
    }

    /// Run `f` on a union and its members, taken out of `next` and put back.
    fn with_union<F>(&self, next: &mut EndResults, union_id: &PoliticalBusinessId, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut ProportionalElectionUnionEndResult, &mut [ProportionalElectionEndResult]) -> EngineResult<()>,
    {
        let mut union = match next.remove(union_id) {
            Some(EndResult::ProportionalElectionUnion(u)) => u,
            Some(other) => {
                next.insert(union_id.clone(), other);
                return Err(EngineError::not_found("proportional election union", union_id));
            }
            None => return Err(EngineError::not_found("proportional election union", union_id)),
        };

        let mut members = Vec::with_capacity(union.election_ids.len());
        for member_id in &union.election_ids {
            match next.remove(member_id) {
                Some(EndResult::ProportionalElection(pe)) => members.push(pe),
                other => {
                    if let Some(o) = other {
                        next.insert(member_id.clone(), o);
                    }
                    let msg = format!("union {union_id} member {member_id} is missing");
                    error!(target: "tally::invariant", "{msg}");
                    return Err(EngineError::invariant(msg));
                }
            }
        }

        let outcome = f(&mut union, &mut members);
        for m in members {
            next.insert(m.political_business_id.clone(), EndResult::ProportionalElection(m));
        }
        next.insert(union_id.clone(), EndResult::ProportionalElectionUnion(union));
        outcome
    }
}

fn entry_mut<'a>(next: &'a mut EndResults, id: &PoliticalBusinessId) -> EngineResult<&'a mut EndResult> {
    next.get_mut(id).ok_or_else(|| EngineError::not_found("end result", id))
}
