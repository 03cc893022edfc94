//! Vote (referendum) end result: yes / no / unanswered per ballot.

use serde::Serialize;
use tracing::info;

use tally_core::entities::{CountOfVoters, DeltaFactor, VoteConfig, VoteResultSnapshot, VotingCards};
use tally_core::ids::{BallotId, PoliticalBusinessId};
use tally_core::{EngineError, EngineResult};

use crate::aggregate::{apply_count, apply_count_of_voters, apply_voting_cards};
use crate::lifecycle::{FinalizationContext, PoliticalBusinessEndResult};
use crate::lot_decisions::AvailableLotDecisions;
use crate::progress::EndResultProgress;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BallotEndResult {
    pub ballot_id: BallotId,
    pub yes: u64,
    pub no: u64,
    pub unanswered: u64,
    /// Set once all counting circles are done; a simple majority of yes over no.
    pub accepted: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteEndResult {
    pub political_business_id: PoliticalBusinessId,
    pub progress: EndResultProgress,
    pub count_of_voters: CountOfVoters,
    pub voting_cards: VotingCards,
    pub ballots: Vec<BallotEndResult>,
}

impl VoteEndResult {
    pub fn new(cfg: &VoteConfig) -> Self {
        VoteEndResult {
            political_business_id: cfg.id.clone(),
            progress: EndResultProgress::new(cfg.total_count_of_counting_circles),
            count_of_voters: CountOfVoters::default(),
            voting_cards: VotingCards::default(),
            ballots: cfg
                .ballots
                .iter()
                .map(|b| BallotEndResult {
                    ballot_id: b.clone(),
                    yes: 0,
                    no: 0,
                    unanswered: 0,
                    accepted: None,
                })
                .collect(),
        }
    }

    pub fn apply_counting_circle_result(
        &mut self,
        result: &VoteResultSnapshot,
        factor: DeltaFactor,
        done_state_changed: bool,
    ) -> EngineResult<()> {
        self.progress.ensure_not_finalized()?;
        for (ballot_id, delta) in &result.ballots {
            let ballot = self
                .ballots
                .iter_mut()
                .find(|b| &b.ballot_id == ballot_id)
                .ok_or_else(|| EngineError::not_found("ballot", ballot_id))?;
            apply_count(&mut ballot.yes, delta.yes, factor, "yes votes")?;
            apply_count(&mut ballot.no, delta.no, factor, "no votes")?;
            apply_count(&mut ballot.unanswered, delta.unanswered, factor, "unanswered votes")?;
        }
        apply_count_of_voters(&mut self.count_of_voters, &result.count_of_voters, factor)?;
        apply_voting_cards(&mut self.voting_cards, &result.voting_cards, factor)?;
        self.progress.apply_done_delta(factor, done_state_changed)?;

        let done = self.progress.all_counting_circles_done();
        for b in &mut self.ballots {
            b.accepted = done.then_some(b.yes > b.no);
        }
        Ok(())
    }
}

impl PoliticalBusinessEndResult for VoteEndResult {
    fn political_business_id(&self) -> &PoliticalBusinessId {
        &self.political_business_id
    }

    fn is_finalized(&self) -> bool {
        self.progress.finalized
    }

    fn finalize(&mut self, _ctx: FinalizationContext) -> EngineResult<()> {
        self.progress.ensure_can_finalize(false)?;
        self.progress.finalized = true;
        info!(political_business = %self.political_business_id, "vote end result finalized");
        Ok(())
    }

    fn revert_finalization(&mut self) -> EngineResult<()> {
        self.progress.ensure_can_revert_finalization()?;
        self.progress.finalized = false;
        info!(political_business = %self.political_business_id, "vote finalization reverted");
        Ok(())
    }

    fn available_lot_decisions(&self) -> AvailableLotDecisions {
        AvailableLotDecisions::empty(self.political_business_id.clone())
    }
}
