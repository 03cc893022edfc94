//! Lifecycle capability shared by every political business kind, and the
//! tagged `EndResult` variant that selects the implementation.

use serde::Serialize;

use tally_core::ids::PoliticalBusinessId;
use tally_core::EngineResult;

use crate::lot_decisions::AvailableLotDecisions;
use crate::majority::MajorityElectionEndResult;
use crate::proportional::ProportionalElectionEndResult;
use crate::union::ProportionalElectionUnionEndResult;
use crate::vote::VoteEndResult;

/// Facts about related end results that a finalization guard needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FinalizationContext {
    /// For union members: whether the union's biproportional result is
    /// distributed. `None` when the end result has no union.
    pub union_distributed: Option<bool>,
}

pub trait PoliticalBusinessEndResult {
    fn political_business_id(&self) -> &PoliticalBusinessId;

    fn is_finalized(&self) -> bool;

    fn finalize(&mut self, ctx: FinalizationContext) -> EngineResult<()>;

    fn revert_finalization(&mut self) -> EngineResult<()>;

    fn available_lot_decisions(&self) -> AvailableLotDecisions;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndResult {
    Vote(VoteEndResult),
    MajorityElection(MajorityElectionEndResult),
    ProportionalElection(ProportionalElectionEndResult),
    ProportionalElectionUnion(ProportionalElectionUnionEndResult),
}

impl EndResult {
    pub fn kind(&self) -> &'static str {
        match self {
            EndResult::Vote(_) => "vote",
            EndResult::MajorityElection(_) => "majority_election",
            EndResult::ProportionalElection(_) => "proportional_election",
            EndResult::ProportionalElectionUnion(_) => "proportional_election_union",
        }
    }

    fn as_dyn(&self) -> &dyn PoliticalBusinessEndResult {
        match self {
            EndResult::Vote(e) => e,
            EndResult::MajorityElection(e) => e,
            EndResult::ProportionalElection(e) => e,
            EndResult::ProportionalElectionUnion(e) => e,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn PoliticalBusinessEndResult {
        match self {
            EndResult::Vote(e) => e,
            EndResult::MajorityElection(e) => e,
            EndResult::ProportionalElection(e) => e,
            EndResult::ProportionalElectionUnion(e) => e,
        }
    }
}

impl PoliticalBusinessEndResult for EndResult {
    fn political_business_id(&self) -> &PoliticalBusinessId {
        self.as_dyn().political_business_id()
    }

    fn is_finalized(&self) -> bool {
        self.as_dyn().is_finalized()
    }

    fn finalize(&mut self, ctx: FinalizationContext) -> EngineResult<()> {
        self.as_dyn_mut().finalize(ctx)
    }

    fn revert_finalization(&mut self) -> EngineResult<()> {
        self.as_dyn_mut().revert_finalization()
    }

    fn available_lot_decisions(&self) -> AvailableLotDecisions {
        self.as_dyn().available_lot_decisions()
    }
}
