//! Proportional election union: one biproportional apportionment across the
//! member elections (rows) and union lists (columns).
//!
//! Contract:
//! - Triggered manually once every member has all counting circles done.
//! - A resolved matrix writes list seats into every member, which then
//!   assigns candidate states; reverting clears the members again.
//! - Any member delta while distributed invalidates the union result.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use tally_algo::allocation::{BiproportionalInput, DoubleProportionalResult, SubdivisionSeats};
use tally_core::entities::ProportionalElectionUnionConfig;
use tally_core::ids::{PoliticalBusinessId, UnionListId};
use tally_core::variables::{DoubleProportionalQuorum, EngineParams};
use tally_core::{EngineError, EngineResult};

use crate::lifecycle::{FinalizationContext, PoliticalBusinessEndResult};
use crate::lot_decisions::{apportionment_options, AvailableLotDecisions};
use crate::proportional::ProportionalElectionEndResult;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProportionalElectionUnionEndResult {
    pub political_business_id: PoliticalBusinessId,
    pub election_ids: Vec<PoliticalBusinessId>,
    pub quorum: DoubleProportionalQuorum,
    pub mandate_distribution_triggered: bool,
    pub finalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub double_proportional: Option<DoubleProportionalResult<PoliticalBusinessId, UnionListId>>,
}

impl ProportionalElectionUnionEndResult {
    pub fn new(cfg: &ProportionalElectionUnionConfig) -> Self {
        ProportionalElectionUnionEndResult {
            political_business_id: cfg.id.clone(),
            election_ids: cfg.election_ids.clone(),
            quorum: cfg.quorum,
            mandate_distribution_triggered: false,
            finalized: false,
            double_proportional: None,
        }
    }

    pub fn is_distributed(&self) -> bool {
        self.double_proportional
            .as_ref()
            .is_some_and(|dp| dp.all_number_of_mandates_distributed)
    }

    fn ensure_not_finalized(&self) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::validation("union end result is finalized"));
        }
        Ok(())
    }

    fn input(
        &self,
        members: &[ProportionalElectionEndResult],
        params: &EngineParams,
    ) -> BiproportionalInput<PoliticalBusinessId, UnionListId> {
        let mut votes = BTreeMap::new();
        let mut seats = BTreeMap::new();
        for m in members {
            if m.lists.iter().any(|l| l.union_list.is_none()) {
                warn!(
                    union = %self.political_business_id,
                    election = %m.political_business_id,
                    "lists without a union list take no part in the union distribution"
                );
            }
            votes.insert(m.political_business_id.clone(), m.union_list_votes());
            seats.insert(m.political_business_id.clone(), u64::from(m.number_of_mandates));
        }
        BiproportionalInput {
            votes,
            rows: SubdivisionSeats::Fixed(seats),
            quorum: self.quorum,
            max_lot_decision_options: params.max_lot_decision_options,
            max_tie_and_transfer_steps: params.max_tie_and_transfer_steps,
        }
    }

    pub fn trigger_mandate_distribution(
        &mut self,
        members: &mut [ProportionalElectionEndResult],
        params: &EngineParams,
    ) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        if self.mandate_distribution_triggered {
            return Err(EngineError::validation("mandate distribution already triggered"));
        }
        for m in members.iter() {
            if m.progress.finalized {
                return Err(EngineError::validation(format!(
                    "member election {} is finalized",
                    m.political_business_id
                )));
            }
            m.progress.ensure_all_counting_circles_done().map_err(|_| {
                EngineError::validation(format!(
                    "not all counting circles of {} are done",
                    m.political_business_id
                ))
            })?;
        }
        let dp = DoubleProportionalResult::calculate(&self.input(members, params))?;
        self.mandate_distribution_triggered = true;
        self.apply(dp, members);
        info!(
            union = %self.political_business_id,
            distributed = self.is_distributed(),
            "union mandates distributed"
        );
        Ok(())
    }

    pub fn revert_mandate_distribution(
        &mut self,
        members: &mut [ProportionalElectionEndResult],
    ) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        if !self.mandate_distribution_triggered {
            return Err(EngineError::validation("mandate distribution has not been triggered"));
        }
        if let Some(m) = members.iter().find(|m| m.progress.finalized) {
            return Err(EngineError::validation(format!(
                "member election {} is finalized",
                m.political_business_id
            )));
        }
        self.clear(members);
        info!(union = %self.political_business_id, "union mandate distribution reverted");
        Ok(())
    }

    /// A member's totals changed under the union.
    pub(crate) fn invalidate(
        &mut self,
        members: &mut [ProportionalElectionEndResult],
    ) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        if self.mandate_distribution_triggered {
            self.clear(members);
            warn!(
                union = %self.political_business_id,
                "member result changed, union mandate distribution must be triggered again"
            );
        }
        Ok(())
    }

    pub fn submit_super_apportionment_lot_decision(
        &mut self,
        number: u32,
        members: &mut [ProportionalElectionEndResult],
        params: &EngineParams,
    ) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        if self.double_proportional.is_none() {
            return Err(EngineError::validation("mandate distribution has not been triggered"));
        }
        let dp = DoubleProportionalResult::apply_super_apportionment_lot_decision(
            &self.input(members, params),
            number,
        )?;
        self.apply(dp, members);
        info!(union = %self.political_business_id, number, "union super apportionment lot decision applied");
        Ok(())
    }

    pub fn submit_sub_apportionment_lot_decision(
        &mut self,
        number: u32,
        members: &mut [ProportionalElectionEndResult],
    ) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        let Some(mut dp) = self.double_proportional.clone() else {
            return Err(EngineError::validation("mandate distribution has not been triggered"));
        };
        dp.apply_sub_apportionment_lot_decision(number)?;
        self.apply(dp, members);
        info!(union = %self.political_business_id, number, "union sub apportionment lot decision applied");
        Ok(())
    }

    fn apply(
        &mut self,
        dp: DoubleProportionalResult<PoliticalBusinessId, UnionListId>,
        members: &mut [ProportionalElectionEndResult],
    ) {
        if dp.all_number_of_mandates_distributed {
            for m in members.iter_mut() {
                m.apply_union_seats(&dp.row_cells(&m.political_business_id));
            }
        } else {
            warn!(
                union = %self.political_business_id,
                "union distribution waits for a lot decision"
            );
            for m in members.iter_mut() {
                m.clear_union_distribution();
            }
        }
        self.double_proportional = Some(dp);
    }

    fn clear(&mut self, members: &mut [ProportionalElectionEndResult]) {
        self.double_proportional = None;
        self.mandate_distribution_triggered = false;
        for m in members.iter_mut() {
            m.clear_union_distribution();
        }
    }
}

impl PoliticalBusinessEndResult for ProportionalElectionUnionEndResult {
    fn political_business_id(&self) -> &PoliticalBusinessId {
        &self.political_business_id
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn finalize(&mut self, _ctx: FinalizationContext) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        if !self.is_distributed() {
            return Err(EngineError::validation("union mandates have not been distributed"));
        }
        self.finalized = true;
        info!(union = %self.political_business_id, "union end result finalized");
        Ok(())
    }

    fn revert_finalization(&mut self) -> EngineResult<()> {
        if !self.finalized {
            return Err(EngineError::validation("union end result is not finalized"));
        }
        self.finalized = false;
        info!(union = %self.political_business_id, "union finalization reverted");
        Ok(())
    }

    fn available_lot_decisions(&self) -> AvailableLotDecisions {
        let mut out = AvailableLotDecisions::empty(self.political_business_id.clone());
        out.union_apportionment = self.double_proportional.as_ref().and_then(apportionment_options);
        out
    }
}
