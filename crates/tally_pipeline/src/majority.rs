//! Majority election end result.
//!
//! Contract:
//! - Candidates are ranked after every delta; lot decisions are enabled only
//!   once all counting circles are done.
//! - Candidate states are calculated automatically when the last circle is
//!   done and recalculated on corrections; they fall back to `Pending` when a
//!   circle is reopened.
//! - Absolute majority: `floor((candidate votes + individual votes) / mandates / 2) + 1`.

use serde::Serialize;
use tracing::{debug, info, warn};

use tally_core::entities::{
    CountOfVoters, DeltaFactor, MajorityElectionConfig, MajorityElectionResultSnapshot, VotingCards,
};
use tally_core::events::CandidateLotDecision;
use tally_core::ids::PoliticalBusinessId;
use tally_core::variables::MajorityElectionMandateAlgorithm;
use tally_core::{EngineError, EngineResult};

use crate::aggregate::{apply_count, apply_count_of_voters, apply_voting_cards};
use crate::candidates::{
    apply_lot_decisions, assign_states, find_mut, has_open_required_lot_decisions, new_candidates,
    rerank, reset_states, update_lot_decision_required, CandidateEndResult, CutLine,
};
use crate::lifecycle::{FinalizationContext, PoliticalBusinessEndResult};
use crate::lot_decisions::{tie_groups_of, AvailableLotDecisions};
use crate::progress::EndResultProgress;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MajorityElectionEndResult {
    pub political_business_id: PoliticalBusinessId,
    pub number_of_mandates: u32,
    pub mandate_algorithm: MajorityElectionMandateAlgorithm,
    pub progress: EndResultProgress,
    pub count_of_voters: CountOfVoters,
    pub voting_cards: VotingCards,
    pub individual_votes: u64,
    pub empty_votes: u64,
    pub invalid_votes: u64,
    pub absolute_majority: Option<u64>,
    pub candidates: Vec<CandidateEndResult>,
}

impl MajorityElectionEndResult {
    pub fn new(cfg: &MajorityElectionConfig) -> Self {
        MajorityElectionEndResult {
            political_business_id: cfg.id.clone(),
            number_of_mandates: cfg.number_of_mandates,
            mandate_algorithm: cfg.mandate_algorithm,
            progress: EndResultProgress::new(cfg.total_count_of_counting_circles),
            count_of_voters: CountOfVoters::default(),
            voting_cards: VotingCards::default(),
            individual_votes: 0,
            empty_votes: 0,
            invalid_votes: 0,
            absolute_majority: None,
            candidates: new_candidates(&cfg.candidates),
        }
    }

    pub fn total_candidate_vote_count(&self) -> u64 {
        self.candidates
            .iter()
            .map(|c| c.vote_count)
            .fold(self.individual_votes, u64::saturating_add)
    }

    fn calculate_absolute_majority(&self) -> Option<u64> {
        match self.mandate_algorithm {
            MajorityElectionMandateAlgorithm::RelativeMajority => None,
            MajorityElectionMandateAlgorithm::AbsoluteMajority if self.number_of_mandates == 0 => {
                None
            }
            MajorityElectionMandateAlgorithm::AbsoluteMajority => Some(
                self.total_candidate_vote_count() / u64::from(self.number_of_mandates) / 2 + 1,
            ),
        }
    }

    pub fn apply_counting_circle_result(
        &mut self,
        result: &MajorityElectionResultSnapshot,
        factor: DeltaFactor,
        done_state_changed: bool,
    ) -> EngineResult<()> {
        self.progress.ensure_not_finalized()?;
        for (candidate_id, votes) in &result.candidate_votes {
            let c = find_mut(&mut self.candidates, candidate_id)?;
            apply_count(&mut c.vote_count, *votes, factor, "candidate votes")?;
        }
        apply_count(&mut self.individual_votes, result.individual_votes, factor, "individual votes")?;
        apply_count(&mut self.empty_votes, result.empty_votes, factor, "empty votes")?;
        apply_count(&mut self.invalid_votes, result.invalid_votes, factor, "invalid votes")?;
        apply_count_of_voters(&mut self.count_of_voters, &result.count_of_voters, factor)?;
        apply_voting_cards(&mut self.voting_cards, &result.voting_cards, factor)?;

        let (was_done, done) = self.progress.apply_done_delta(factor, done_state_changed)?;
        rerank(&mut self.candidates, done);
        debug!(
            political_business = %self.political_business_id,
            factor = factor.sign(),
            done_counting_circles = self.progress.count_of_done_counting_circles,
            "majority election delta applied"
        );

        if done {
            self.calculate_candidate_states();
        } else if was_done {
            self.reset_candidate_states();
        }
        Ok(())
    }

    pub fn submit_lot_decisions(&mut self, decisions: &[CandidateLotDecision]) -> EngineResult<()> {
        self.progress.ensure_not_finalized()?;
        if !self.progress.all_counting_circles_done() {
            return Err(EngineError::validation(
                "lot decisions are possible once all counting circles are done",
            ));
        }
        let cut_line = self.cut_line();
        apply_lot_decisions(&mut self.candidates, Some(cut_line), decisions)?;
        self.calculate_candidate_states();
        info!(
            political_business = %self.political_business_id,
            decisions = decisions.len(),
            "majority election lot decisions applied"
        );
        Ok(())
    }

    /// Ties entirely below the absolute majority need no decision.
    fn cut_line(&self) -> CutLine {
        CutLine { number_of_mandates: self.number_of_mandates, absolute_majority: self.absolute_majority }
    }

    fn calculate_candidate_states(&mut self) {
        self.absolute_majority = self.calculate_absolute_majority();
        let cut_line = self.cut_line();
        update_lot_decision_required(&mut self.candidates, cut_line);
        assign_states(&mut self.candidates, self.number_of_mandates, self.absolute_majority);
        self.progress.mandate_distribution_triggered = true;
        if has_open_required_lot_decisions(&self.candidates) {
            warn!(
                political_business = %self.political_business_id,
                "majority election has open required lot decisions"
            );
        }
    }

    fn reset_candidate_states(&mut self) {
        self.absolute_majority = None;
        reset_states(&mut self.candidates);
        self.progress.mandate_distribution_triggered = false;
    }
}

impl PoliticalBusinessEndResult for MajorityElectionEndResult {
    fn political_business_id(&self) -> &PoliticalBusinessId {
        &self.political_business_id
    }

    fn is_finalized(&self) -> bool {
        self.progress.finalized
    }

    fn finalize(&mut self, _ctx: FinalizationContext) -> EngineResult<()> {
        self.progress.ensure_can_finalize(true)?;
        if has_open_required_lot_decisions(&self.candidates) {
            return Err(EngineError::validation("required lot decisions are open"));
        }
        self.progress.finalized = true;
        info!(political_business = %self.political_business_id, "majority election finalized");
        Ok(())
    }

    fn revert_finalization(&mut self) -> EngineResult<()> {
        self.progress.ensure_can_revert_finalization()?;
        self.progress.finalized = false;
        info!(political_business = %self.political_business_id, "majority election finalization reverted");
        Ok(())
    }

    fn available_lot_decisions(&self) -> AvailableLotDecisions {
        let mut out = AvailableLotDecisions::empty(self.political_business_id.clone());
        out.tie_groups = tie_groups_of(None, &self.candidates, Some(self.cut_line()));
        out
    }
}
