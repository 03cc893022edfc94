//! Proportional election end result.
//!
//! Contract:
//! - Deltas update list and candidate subtotals and re-rank each list.
//! - Hagenbach-Bischoff and single double-proportional elections distribute
//!   automatically when the last circle is done (if enabled), re-distribute
//!   on corrections and revert when a circle is reopened.
//! - Union members receive their list seats from the union.
//! - An unresolvable Hagenbach-Bischoff tie sets `manual_end_result_required`;
//!   candidate states then wait for a manual end result.
//!
//! The distribution tree and biproportional result are rebuilt from scratch
//! on every run.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use tally_algo::allocation::{
    hagenbach_bischoff_distribute, BiproportionalInput, DoubleProportionalResult,
    HagenbachBischoffGroup, HbList, SubdivisionSeats,
};
use tally_core::entities::{
    CountOfVoters, DeltaFactor, ProportionalElectionConfig, ProportionalElectionResultSnapshot,
    VotingCards,
};
use tally_core::events::{CandidateLotDecision, ManualCandidateState};
use tally_core::ids::{CandidateId, ListId, ListUnionId, PoliticalBusinessId, UnionListId};
use tally_core::variables::{
    DoubleProportionalQuorum, EngineParams, ProportionalElectionMandateAlgorithm,
};
use tally_core::{EngineError, EngineResult};

use crate::aggregate::{apply_count, apply_count_of_voters, apply_keyed_count, apply_voting_cards};
use crate::candidates::{
    apply_lot_decisions, assign_states, find_mut, has_open_required_lot_decisions, new_candidates,
    rerank, reset_states, update_lot_decision_required, CandidateEndResult, CutLine,
    CandidateEndResultState,
};
use crate::lifecycle::{FinalizationContext, PoliticalBusinessEndResult};
use crate::lot_decisions::{apportionment_options, tie_groups_of, AvailableLotDecisions};
use crate::progress::EndResultProgress;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListEndResult {
    pub list_id: ListId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_union: Option<ListUnionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_list_union: Option<ListUnionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub union_list: Option<UnionListId>,
    pub unmodified_lists_votes_count: u64,
    pub modified_lists_votes_count: u64,
    pub blank_rows_count: u64,
    pub number_of_mandates: u64,
    pub has_open_required_lot_decisions: bool,
    pub candidates: Vec<CandidateEndResult>,
}

impl ListEndResult {
    /// Party votes: unmodified and modified list votes plus blank rows.
    pub fn list_votes_count(&self) -> u64 {
        self.unmodified_lists_votes_count
            .saturating_add(self.modified_lists_votes_count)
            .saturating_add(self.blank_rows_count)
    }

    fn seats_as_cut_line(&self) -> CutLine {
        CutLine::seats(u32::try_from(self.number_of_mandates).unwrap_or(u32::MAX))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProportionalElectionEndResult {
    pub political_business_id: PoliticalBusinessId,
    pub number_of_mandates: u32,
    pub mandate_algorithm: ProportionalElectionMandateAlgorithm,
    pub quorum: DoubleProportionalQuorum,
    pub progress: EndResultProgress,
    /// List seats are final (resolved distribution or entered manually).
    pub number_of_mandates_distributed: bool,
    pub manual_end_result_entered: bool,
    pub count_of_voters: CountOfVoters,
    pub voting_cards: VotingCards,
    pub lists: Vec<ListEndResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hagenbach_bischoff: Option<HagenbachBischoffGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_proportional: Option<DoubleProportionalResult<PoliticalBusinessId, ListId>>,
}

impl ProportionalElectionEndResult {
    pub fn new(cfg: &ProportionalElectionConfig) -> Self {
        ProportionalElectionEndResult {
            political_business_id: cfg.id.clone(),
            number_of_mandates: cfg.number_of_mandates,
            mandate_algorithm: cfg.mandate_algorithm,
            quorum: cfg.quorum,
            progress: EndResultProgress::new(cfg.total_count_of_counting_circles),
            number_of_mandates_distributed: false,
            manual_end_result_entered: false,
            count_of_voters: CountOfVoters::default(),
            voting_cards: VotingCards::default(),
            lists: cfg
                .lists
                .iter()
                .map(|l| ListEndResult {
                    list_id: l.id.clone(),
                    list_union: l.list_union.clone(),
                    sub_list_union: l.sub_list_union.clone(),
                    union_list: l.union_list.clone(),
                    unmodified_lists_votes_count: 0,
                    modified_lists_votes_count: 0,
                    blank_rows_count: 0,
                    number_of_mandates: 0,
                    has_open_required_lot_decisions: false,
                    candidates: new_candidates(&l.candidates),
                })
                .collect(),
            hagenbach_bischoff: None,
            double_proportional: None,
        }
    }

    /// Seats come from a union whose operator triggers the distribution.
    pub fn is_union_member(&self) -> bool {
        !self.mandate_algorithm.triggers_automatically()
    }

    pub fn list(&self, list_id: &ListId) -> EngineResult<&ListEndResult> {
        self.lists
            .iter()
            .find(|l| &l.list_id == list_id)
            .ok_or_else(|| EngineError::not_found("list", list_id))
    }

    fn list_mut(&mut self, list_id: &ListId) -> EngineResult<&mut ListEndResult> {
        self.lists
            .iter_mut()
            .find(|l| &l.list_id == list_id)
            .ok_or_else(|| EngineError::not_found("list", list_id))
    }

    /// Party votes per union list (the union's biproportional columns).
    pub fn union_list_votes(&self) -> BTreeMap<UnionListId, u64> {
        let mut out: BTreeMap<UnionListId, u64> = BTreeMap::new();
        for l in &self.lists {
            if let Some(u) = &l.union_list {
                let e = out.entry(u.clone()).or_insert(0);
                *e = e.saturating_add(l.list_votes_count());
            }
        }
        out
    }

    /// Fold one counting circle's result in (`Add`) or out (`Remove`).
    pub fn apply_counting_circle_result(
        &mut self,
        result: &ProportionalElectionResultSnapshot,
        factor: DeltaFactor,
        done_state_changed: bool,
        params: &EngineParams,
    ) -> EngineResult<()> {
        self.progress.ensure_not_finalized()?;
        for (list_id, delta) in &result.lists {
            let list = self.list_mut(list_id)?;
            apply_count(
                &mut list.unmodified_lists_votes_count,
                delta.unmodified_lists_votes_count,
                factor,
                "unmodified list votes",
            )?;
            apply_count(
                &mut list.modified_lists_votes_count,
                delta.modified_lists_votes_count,
                factor,
                "modified list votes",
            )?;
            apply_count(&mut list.blank_rows_count, delta.blank_rows_count, factor, "blank rows")?;
            for (candidate_id, cr) in &delta.candidates {
                let c = find_mut(&mut list.candidates, candidate_id)?;
                apply_count(&mut c.vote_count, cr.vote_count, factor, "candidate votes")?;
                for (source, votes) in &cr.vote_sources {
                    apply_keyed_count(&mut c.vote_sources, source, *votes, factor, "vote source")?;
                }
            }
        }
        apply_count_of_voters(&mut self.count_of_voters, &result.count_of_voters, factor)?;
        apply_voting_cards(&mut self.voting_cards, &result.voting_cards, factor)?;

        let (was_done, done) = self.progress.apply_done_delta(factor, done_state_changed)?;
        for list in &mut self.lists {
            rerank(&mut list.candidates, done);
        }
        debug!(
            political_business = %self.political_business_id,
            factor = factor.sign(),
            done_counting_circles = self.progress.count_of_done_counting_circles,
            "proportional election delta applied"
        );

        if self.is_union_member() {
            // seats come from the union; the set invalidates its distribution
            self.update_candidate_states();
            return Ok(());
        }
        match (was_done, done) {
            (true, false) if self.progress.mandate_distribution_triggered => {
                self.clear_distribution();
                info!(
                    political_business = %self.political_business_id,
                    "mandate distribution reverted, a counting circle was reopened"
                );
            }
            (false, true) if params.automatic_mandate_distribution => self.distribute(params)?,
            (true, true) if self.progress.mandate_distribution_triggered => {
                if self.progress.manual_end_result_required {
                    warn!(
                        political_business = %self.political_business_id,
                        "correction ignored by the distribution, a manual end result is required"
                    );
                } else {
                    self.distribute(params)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Operator trigger (Hagenbach-Bischoff and single double-proportional).
    pub fn trigger_mandate_distribution(&mut self, params: &EngineParams) -> EngineResult<()> {
        if self.is_union_member() {
            return Err(EngineError::validation(
                "mandates of a union member are distributed by its union",
            ));
        }
        self.progress.ensure_can_trigger_distribution()?;
        self.distribute(params)
    }

    pub fn revert_mandate_distribution(&mut self) -> EngineResult<()> {
        if self.is_union_member() {
            return Err(EngineError::validation(
                "mandates of a union member are reverted by its union",
            ));
        }
        self.progress.ensure_can_revert_distribution()?;
        self.clear_distribution();
        info!(political_business = %self.political_business_id, "mandate distribution reverted");
        Ok(())
    }

    fn distribute(&mut self, params: &EngineParams) -> EngineResult<()> {
        self.clear_distribution();
        match self.mandate_algorithm {
            ProportionalElectionMandateAlgorithm::HagenbachBischoff => {
                let lists: Vec<HbList> = self
                    .lists
                    .iter()
                    .map(|l| HbList {
                        id: l.list_id.clone(),
                        list_union: l.list_union.clone(),
                        sub_list_union: l.sub_list_union.clone(),
                        vote_count: l.list_votes_count(),
                    })
                    .collect();
                let result = hagenbach_bischoff_distribute(&lists, u64::from(self.number_of_mandates))?;
                self.progress.manual_end_result_required = result.manual_end_result_required;
                if result.manual_end_result_required {
                    warn!(
                        political_business = %self.political_business_id,
                        "hagenbach-bischoff tie cannot be broken, manual end result required"
                    );
                } else {
                    for l in &mut self.lists {
                        l.number_of_mandates = result.list_seats.get(&l.list_id).copied().unwrap_or(0);
                    }
                    self.number_of_mandates_distributed = true;
                }
                self.hagenbach_bischoff = Some(result.root);
            }
            ProportionalElectionMandateAlgorithm::DoubleProportionalSingle => {
                let dp = DoubleProportionalResult::calculate(&self.single_dp_input(params))?;
                self.apply_single_dp(dp);
            }
            ProportionalElectionMandateAlgorithm::DoubleProportionalUnion => {
                return Err(EngineError::validation(
                    "mandates of a union member are distributed by its union",
                ));
            }
        }
        self.progress.mandate_distribution_triggered = true;
        self.update_candidate_states();
        info!(
            political_business = %self.political_business_id,
            algorithm = ?self.mandate_algorithm,
            distributed = self.number_of_mandates_distributed,
            "mandates distributed"
        );
        Ok(())
    }

    fn single_dp_input(&self, params: &EngineParams) -> BiproportionalInput<PoliticalBusinessId, ListId> {
        let row: BTreeMap<ListId, u64> =
            self.lists.iter().map(|l| (l.list_id.clone(), l.list_votes_count())).collect();
        BiproportionalInput {
            votes: BTreeMap::from([(self.political_business_id.clone(), row)]),
            rows: SubdivisionSeats::Fixed(BTreeMap::from([(
                self.political_business_id.clone(),
                u64::from(self.number_of_mandates),
            )])),
            quorum: self.quorum,
            max_lot_decision_options: params.max_lot_decision_options,
            max_tie_and_transfer_steps: params.max_tie_and_transfer_steps,
        }
    }

    fn apply_single_dp(&mut self, dp: DoubleProportionalResult<PoliticalBusinessId, ListId>) {
        if dp.all_number_of_mandates_distributed {
            let seats = dp.row_cells(&self.political_business_id);
            for l in &mut self.lists {
                l.number_of_mandates = seats.get(&l.list_id).copied().unwrap_or(0);
            }
        } else {
            warn!(
                political_business = %self.political_business_id,
                "double proportional distribution waits for a lot decision"
            );
            for l in &mut self.lists {
                l.number_of_mandates = 0;
            }
        }
        self.number_of_mandates_distributed = dp.all_number_of_mandates_distributed;
        self.double_proportional = Some(dp);
    }

    fn ensure_single_dp(&self) -> EngineResult<()> {
        if self.mandate_algorithm != ProportionalElectionMandateAlgorithm::DoubleProportionalSingle {
            return Err(EngineError::validation(
                "apportionment lot decisions apply to single double proportional elections only",
            ));
        }
        self.progress.ensure_not_finalized()?;
        if self.double_proportional.is_none() {
            return Err(EngineError::validation("mandate distribution has not been triggered"));
        }
        Ok(())
    }

    pub fn submit_super_apportionment_lot_decision(
        &mut self,
        number: u32,
        params: &EngineParams,
    ) -> EngineResult<()> {
        self.ensure_single_dp()?;
        let dp = DoubleProportionalResult::apply_super_apportionment_lot_decision(
            &self.single_dp_input(params),
            number,
        )?;
        self.apply_single_dp(dp);
        self.update_candidate_states();
        info!(political_business = %self.political_business_id, number, "super apportionment lot decision applied");
        Ok(())
    }

    pub fn submit_sub_apportionment_lot_decision(&mut self, number: u32) -> EngineResult<()> {
        self.ensure_single_dp()?;
        let Some(mut dp) = self.double_proportional.clone() else {
            return Err(EngineError::validation("mandate distribution has not been triggered"));
        };
        dp.apply_sub_apportionment_lot_decision(number)?;
        self.apply_single_dp(dp);
        self.update_candidate_states();
        info!(political_business = %self.political_business_id, number, "sub apportionment lot decision applied");
        Ok(())
    }

    /// Seats handed down by the union, keyed by union list.
    pub(crate) fn apply_union_seats(&mut self, seats: &BTreeMap<UnionListId, u64>) {
        for l in &mut self.lists {
            l.number_of_mandates = l
                .union_list
                .as_ref()
                .and_then(|u| seats.get(u))
                .copied()
                .unwrap_or(0);
        }
        self.progress.mandate_distribution_triggered = true;
        self.number_of_mandates_distributed = true;
        self.update_candidate_states();
    }

    /// The union's distribution is gone (reverted, re-run or invalidated).
    pub(crate) fn clear_union_distribution(&mut self) {
        self.clear_distribution();
    }

    pub fn submit_lot_decisions(
        &mut self,
        list_id: &ListId,
        decisions: &[CandidateLotDecision],
    ) -> EngineResult<()> {
        self.progress.ensure_not_finalized()?;
        if !self.progress.all_counting_circles_done() {
            return Err(EngineError::validation(
                "lot decisions are possible once all counting circles are done",
            ));
        }
        let distributed = self.number_of_mandates_distributed && !self.manual_end_result_entered;
        let list = self.list_mut(list_id)?;
        let cut_line = distributed.then(|| list.seats_as_cut_line());
        apply_lot_decisions(&mut list.candidates, cut_line, decisions)?;
        self.update_candidate_states();
        info!(
            political_business = %self.political_business_id,
            list = %list_id,
            decisions = decisions.len(),
            "list lot decisions applied"
        );
        Ok(())
    }

    /// Operator-entered candidate states for an unresolvable distribution.
    pub fn enter_manual_end_result(&mut self, states: &[ManualCandidateState]) -> EngineResult<()> {
        self.progress.ensure_not_finalized()?;
        if !self.progress.manual_end_result_required {
            return Err(EngineError::validation("no manual end result is required"));
        }

        let known: BTreeSet<&CandidateId> = self
            .lists
            .iter()
            .flat_map(|l| l.candidates.iter().map(|c| &c.candidate_id))
            .collect();
        let mut elected: BTreeMap<&CandidateId, bool> = BTreeMap::new();
        for s in states {
            if !known.contains(&s.candidate_id) {
                return Err(EngineError::not_found("candidate", &s.candidate_id));
            }
            if elected.insert(&s.candidate_id, s.elected).is_some() {
                return Err(EngineError::validation(format!(
                    "candidate {} listed twice",
                    s.candidate_id
                )));
            }
        }
        if elected.len() != known.len() {
            return Err(EngineError::validation(format!(
                "manual end result lists {} of {} candidates",
                elected.len(),
                known.len()
            )));
        }
        let elected_count = elected.values().filter(|&&e| e).count();
        if elected_count as u64 != u64::from(self.number_of_mandates) {
            return Err(EngineError::validation(format!(
                "{elected_count} candidates elected for {} mandates",
                self.number_of_mandates
            )));
        }

        let decided: BTreeMap<CandidateId, bool> =
            elected.into_iter().map(|(id, e)| (id.clone(), e)).collect();
        for l in &mut self.lists {
            let mut seats = 0u64;
            for c in &mut l.candidates {
                let is_elected = decided.get(&c.candidate_id).copied().unwrap_or(false);
                c.state = if is_elected {
                    seats += 1;
                    CandidateEndResultState::Elected
                } else {
                    CandidateEndResultState::NotElected
                };
                c.lot_decision_required = false;
            }
            l.number_of_mandates = seats;
            l.has_open_required_lot_decisions = false;
        }
        self.manual_end_result_entered = true;
        self.number_of_mandates_distributed = true;
        info!(political_business = %self.political_business_id, elected = elected_count, "manual end result entered");
        Ok(())
    }

    fn clear_distribution(&mut self) {
        self.hagenbach_bischoff = None;
        self.double_proportional = None;
        self.number_of_mandates_distributed = false;
        self.manual_end_result_entered = false;
        self.progress.mandate_distribution_triggered = false;
        self.progress.manual_end_result_required = false;
        for l in &mut self.lists {
            l.number_of_mandates = 0;
            l.has_open_required_lot_decisions = false;
            reset_states(&mut l.candidates);
        }
    }

    fn update_candidate_states(&mut self) {
        if self.manual_end_result_entered {
            return;
        }
        for l in &mut self.lists {
            if self.number_of_mandates_distributed {
                let cut = l.seats_as_cut_line();
                update_lot_decision_required(&mut l.candidates, cut);
                assign_states(&mut l.candidates, cut.number_of_mandates, None);
                l.has_open_required_lot_decisions = has_open_required_lot_decisions(&l.candidates);
            } else {
                reset_states(&mut l.candidates);
                l.has_open_required_lot_decisions = false;
            }
        }
    }
}

impl PoliticalBusinessEndResult for ProportionalElectionEndResult {
    fn political_business_id(&self) -> &PoliticalBusinessId {
        &self.political_business_id
    }

    fn is_finalized(&self) -> bool {
        self.progress.finalized
    }

    fn finalize(&mut self, ctx: FinalizationContext) -> EngineResult<()> {
        self.progress.ensure_can_finalize(true)?;
        if self.progress.manual_end_result_required && !self.manual_end_result_entered {
            return Err(EngineError::validation("a manual end result is required"));
        }
        match self.mandate_algorithm {
            ProportionalElectionMandateAlgorithm::HagenbachBischoff => {}
            ProportionalElectionMandateAlgorithm::DoubleProportionalSingle => {
                if !self
                    .double_proportional
                    .as_ref()
                    .is_some_and(|dp| dp.all_number_of_mandates_distributed)
                {
                    return Err(EngineError::validation(
                        "double proportional mandates are not distributed",
                    ));
                }
            }
            ProportionalElectionMandateAlgorithm::DoubleProportionalUnion => {
                if ctx.union_distributed != Some(true) {
                    return Err(EngineError::validation(
                        "union double proportional mandates are not distributed",
                    ));
                }
            }
        }
        if self.lists.iter().any(|l| l.has_open_required_lot_decisions) {
            return Err(EngineError::validation("required lot decisions are open"));
        }
        self.progress.finalized = true;
        info!(political_business = %self.political_business_id, "proportional election finalized");
        Ok(())
    }

    fn revert_finalization(&mut self) -> EngineResult<()> {
        self.progress.ensure_can_revert_finalization()?;
        self.progress.finalized = false;
        info!(political_business = %self.political_business_id, "proportional election finalization reverted");
        Ok(())
    }

    fn available_lot_decisions(&self) -> AvailableLotDecisions {
        let mut out = AvailableLotDecisions::empty(self.political_business_id.clone());
        let distributed = self.number_of_mandates_distributed && !self.manual_end_result_entered;
        for l in &self.lists {
            let cut_line = distributed.then(|| l.seats_as_cut_line());
            out.tie_groups.extend(tie_groups_of(Some(&l.list_id), &l.candidates, cut_line));
        }
        out.list_apportionment = self.double_proportional.as_ref().and_then(apportionment_options);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::entities::{CandidateResult, ListConfig, ListResult};

    fn id<T: std::str::FromStr>(s: &str) -> T
    where
        T::Err: std::fmt::Debug,
    {
        s.parse().unwrap()
    }

    fn list_cfg(list: &str, candidates: &[&str]) -> ListConfig {
        ListConfig {
            id: id(list),
            list_union: None,
            sub_list_union: None,
            union_list: None,
            candidates: candidates.iter().map(|c| id(c)).collect(),
        }
    }

    fn cfg(algorithm: ProportionalElectionMandateAlgorithm, mandates: u32) -> ProportionalElectionConfig {
        ProportionalElectionConfig {
            id: id("pe-1"),
            number_of_mandates: mandates,
            mandate_algorithm: algorithm,
            total_count_of_counting_circles: 1,
            quorum: DoubleProportionalQuorum::default(),
            lists: vec![list_cfg("L1", &["L1a", "L1b", "L1c"]), list_cfg("L2", &["L2a", "L2b"])],
        }
    }

    fn list_result(votes: u64, candidates: &[(&str, u64)]) -> ListResult {
        ListResult {
            unmodified_lists_votes_count: votes,
            candidates: candidates
                .iter()
                .map(|(c, v)| (id(c), CandidateResult { vote_count: *v, ..CandidateResult::default() }))
                .collect(),
            ..ListResult::default()
        }
    }

    fn snapshot(l1: u64, l2: u64) -> ProportionalElectionResultSnapshot {
        ProportionalElectionResultSnapshot {
            lists: BTreeMap::from([
                (id("L1"), list_result(l1, &[("L1a", 300), ("L1b", 200), ("L1c", 100)])),
                (id("L2"), list_result(l2, &[("L2a", 250), ("L2b", 150)])),
            ]),
            ..ProportionalElectionResultSnapshot::default()
        }
    }

    fn seats(pe: &ProportionalElectionEndResult) -> Vec<u64> {
        pe.lists.iter().map(|l| l.number_of_mandates).collect()
    }

    fn state(pe: &ProportionalElectionEndResult, c: &str) -> CandidateEndResultState {
        pe.lists
            .iter()
            .flat_map(|l| &l.candidates)
            .find(|x| x.candidate_id.as_str() == c)
            .unwrap()
            .state
    }

    #[test]
    fn hagenbach_bischoff_distributes_when_all_circles_are_done() {
        let params = EngineParams::default();
        let mut pe = ProportionalElectionEndResult::new(&cfg(ProportionalElectionMandateAlgorithm::HagenbachBischoff, 5));
        pe.apply_counting_circle_result(&snapshot(600, 400), DeltaFactor::Add, true, &params).unwrap();
        assert_eq!(seats(&pe), vec![3, 2]);
        assert!(pe.progress.mandate_distribution_triggered);
        assert!(pe.hagenbach_bischoff.is_some());
        assert_eq!(state(&pe, "L1c"), CandidateEndResultState::Elected);
        assert_eq!(state(&pe, "L2b"), CandidateEndResultState::Elected);
        pe.finalize(FinalizationContext::default()).unwrap();
    }

    #[test]
    fn reopening_a_circle_reverts_the_distribution() {
        let params = EngineParams::default();
        let mut pe = ProportionalElectionEndResult::new(&cfg(ProportionalElectionMandateAlgorithm::HagenbachBischoff, 2));
        let fresh = pe.clone();
        pe.apply_counting_circle_result(&snapshot(600, 400), DeltaFactor::Add, true, &params).unwrap();
        assert_eq!(seats(&pe), vec![1, 1]);
        assert_eq!(state(&pe, "L1b"), CandidateEndResultState::NotElected);
        pe.apply_counting_circle_result(&snapshot(600, 400), DeltaFactor::Remove, true, &params).unwrap();
        assert_eq!(pe, fresh);
    }

    #[test]
    fn manual_trigger_when_automatic_distribution_is_off() {
        let params = EngineParams { automatic_mandate_distribution: false, ..EngineParams::default() };
        let mut pe = ProportionalElectionEndResult::new(&cfg(ProportionalElectionMandateAlgorithm::HagenbachBischoff, 5));
        assert!(pe.trigger_mandate_distribution(&params).is_err());
        pe.apply_counting_circle_result(&snapshot(600, 400), DeltaFactor::Add, true, &params).unwrap();
        assert!(!pe.progress.mandate_distribution_triggered);
        pe.trigger_mandate_distribution(&params).unwrap();
        assert!(pe.trigger_mandate_distribution(&params).is_err());
        pe.revert_mandate_distribution().unwrap();
        assert_eq!(seats(&pe), vec![0, 0]);
        assert!(pe.revert_mandate_distribution().is_err());
    }

    #[test]
    fn unbreakable_tie_needs_manual_end_result() {
        let params = EngineParams::default();
        let mut pe = ProportionalElectionEndResult::new(&cfg(ProportionalElectionMandateAlgorithm::HagenbachBischoff, 1));
        pe.apply_counting_circle_result(&snapshot(500, 500), DeltaFactor::Add, true, &params).unwrap();
        assert!(pe.progress.manual_end_result_required);
        assert!(!pe.number_of_mandates_distributed);
        assert!(pe.finalize(FinalizationContext::default()).is_err());

        let manual = |elected: &[&str]| -> Vec<ManualCandidateState> {
            ["L1a", "L1b", "L1c", "L2a", "L2b"]
                .iter()
                .map(|c| ManualCandidateState { candidate_id: id(c), elected: elected.contains(c) })
                .collect()
        };
        assert!(pe.enter_manual_end_result(&manual(&["L1a", "L2a"])).is_err());
        assert!(pe.enter_manual_end_result(&manual(&[])).is_err());
        assert!(pe.enter_manual_end_result(&manual(&["L1a"])[..4]).is_err());

        pe.enter_manual_end_result(&manual(&["L2a"])).unwrap();
        assert_eq!(seats(&pe), vec![0, 1]);
        assert_eq!(state(&pe, "L2a"), CandidateEndResultState::Elected);
        pe.finalize(FinalizationContext::default()).unwrap();
    }

    #[test]
    fn list_lot_decision_at_the_cut_line() {
        let params = EngineParams::default();
        let mut c = cfg(ProportionalElectionMandateAlgorithm::HagenbachBischoff, 4);
        c.lists[1].candidates.push(id("L2c"));
        let mut pe = ProportionalElectionEndResult::new(&c);
        let mut s = snapshot(700, 300);
        if let Some(l2) = s.lists.get_mut(&id::<ListId>("L2")) {
            l2.candidates.insert(id("L2b"), CandidateResult { vote_count: 250, ..CandidateResult::default() });
        }
        // L2a and L2b tie for L2's single seat
        pe.apply_counting_circle_result(&s, DeltaFactor::Add, true, &params).unwrap();
        assert_eq!(seats(&pe), vec![3, 1]);
        assert!(pe.lists[1].has_open_required_lot_decisions);
        assert_eq!(state(&pe, "L2a"), CandidateEndResultState::Pending);
        assert!(pe.finalize(FinalizationContext::default()).is_err());
        let groups = pe.available_lot_decisions().tie_groups;
        assert_eq!(groups.len(), 1);
        assert!(groups[0].required);
        assert_eq!(groups[0].list_id, Some(id("L2")));

        let l2: ListId = id("L2");
        let lot = |a: u32, b: u32| {
            vec![
                CandidateLotDecision { candidate_id: id("L2a"), rank: Some(a) },
                CandidateLotDecision { candidate_id: id("L2b"), rank: Some(b) },
            ]
        };
        assert!(pe.submit_lot_decisions(&l2, &lot(1, 1)).is_err());
        assert!(matches!(
            pe.submit_lot_decisions(&id("L9"), &lot(1, 2)),
            Err(EngineError::NotFound { kind: "list", .. })
        ));
        pe.submit_lot_decisions(&l2, &lot(2, 1)).unwrap();
        assert_eq!(state(&pe, "L2b"), CandidateEndResultState::Elected);
        assert_eq!(state(&pe, "L2a"), CandidateEndResultState::NotElected);
        assert!(!pe.lists[1].has_open_required_lot_decisions);
        pe.finalize(FinalizationContext::default()).unwrap();
    }

    #[test]
    fn single_double_proportional_distribution() {
        let params = EngineParams::default();
        let mut pe =
            ProportionalElectionEndResult::new(&cfg(ProportionalElectionMandateAlgorithm::DoubleProportionalSingle, 5));
        pe.apply_counting_circle_result(&snapshot(600, 400), DeltaFactor::Add, true, &params).unwrap();
        assert_eq!(seats(&pe), vec![3, 2]);
        assert!(pe.double_proportional.as_ref().unwrap().all_number_of_mandates_distributed);
        pe.finalize(FinalizationContext::default()).unwrap();
    }

    #[test]
    fn single_double_proportional_tie_waits_for_super_lot_decision() {
        let params = EngineParams::default();
        let mut pe =
            ProportionalElectionEndResult::new(&cfg(ProportionalElectionMandateAlgorithm::DoubleProportionalSingle, 1));
        pe.apply_counting_circle_result(&snapshot(500, 500), DeltaFactor::Add, true, &params).unwrap();
        assert!(!pe.number_of_mandates_distributed);
        assert!(pe.available_lot_decisions().list_apportionment.is_some());
        assert!(pe.finalize(FinalizationContext::default()).is_err());
        assert!(pe.submit_sub_apportionment_lot_decision(1).is_err());

        pe.submit_super_apportionment_lot_decision(2, &params).unwrap();
        assert_eq!(seats(&pe).iter().sum::<u64>(), 1);
        assert!(pe.available_lot_decisions().list_apportionment.is_none());
        pe.finalize(FinalizationContext::default()).unwrap();
    }

    #[test]
    fn union_member_waits_for_union() {
        let params = EngineParams::default();
        let mut c = cfg(ProportionalElectionMandateAlgorithm::DoubleProportionalUnion, 5);
        c.lists[0].union_list = Some(id("P1"));
        c.lists[1].union_list = Some(id("P2"));
        let mut pe = ProportionalElectionEndResult::new(&c);
        pe.apply_counting_circle_result(&snapshot(600, 400), DeltaFactor::Add, true, &params).unwrap();
        assert!(!pe.progress.mandate_distribution_triggered);
        assert!(pe.trigger_mandate_distribution(&params).is_err());
        assert_eq!(pe.union_list_votes().get(&id::<UnionListId>("P1")), Some(&600));

        pe.apply_union_seats(&BTreeMap::from([(id("P1"), 3), (id("P2"), 2)]));
        assert_eq!(seats(&pe), vec![3, 2]);
        assert!(pe.finalize(FinalizationContext { union_distributed: None }).is_err());
        pe.finalize(FinalizationContext { union_distributed: Some(true) }).unwrap();
    }
}
