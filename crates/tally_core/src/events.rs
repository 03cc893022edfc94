//! Events consumed by the engine: result deltas from the submission workflow
//! and operator actions. Each event addresses one political business.

use serde::{Deserialize, Serialize};

use crate::entities::{CountingCircleResultSnapshot, DeltaFactor};
use crate::ids::{CandidateId, CountingCircleId, ListId, PoliticalBusinessId};

/// `rank == None` leaves the candidate's tie group undecided.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidateLotDecision {
    pub candidate_id: CandidateId,
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ManualCandidateState {
    pub candidate_id: CandidateId,
    pub elected: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndResultEvent {
    CountingCircleResultApplied {
        political_business_id: PoliticalBusinessId,
        counting_circle_id: CountingCircleId,
        factor: DeltaFactor,
        /// The circle crossed the "counted" threshold with this transition.
        done_state_changed: bool,
        result: CountingCircleResultSnapshot,
    },
    LotDecisionsSubmitted {
        political_business_id: PoliticalBusinessId,
        /// Required for proportional elections, absent for majority elections.
        #[serde(default)]
        list_id: Option<ListId>,
        decisions: Vec<CandidateLotDecision>,
    },
    MandateDistributionTriggered {
        political_business_id: PoliticalBusinessId,
    },
    MandateDistributionReverted {
        political_business_id: PoliticalBusinessId,
    },
    SuperApportionmentLotDecisionSubmitted {
        political_business_id: PoliticalBusinessId,
        number: u32,
    },
    SubApportionmentLotDecisionSubmitted {
        political_business_id: PoliticalBusinessId,
        number: u32,
    },
    ManualEndResultEntered {
        political_business_id: PoliticalBusinessId,
        candidates: Vec<ManualCandidateState>,
    },
    Finalized {
        political_business_id: PoliticalBusinessId,
    },
    FinalizationReverted {
        political_business_id: PoliticalBusinessId,
    },
    EndResultReset {
        political_business_id: PoliticalBusinessId,
    },
}

impl EndResultEvent {
    pub fn political_business_id(&self) -> &PoliticalBusinessId {
        use EndResultEvent::*;
        match self {
            CountingCircleResultApplied { political_business_id, .. }
            | LotDecisionsSubmitted { political_business_id, .. }
            | MandateDistributionTriggered { political_business_id }
            | MandateDistributionReverted { political_business_id }
            | SuperApportionmentLotDecisionSubmitted { political_business_id, .. }
            | SubApportionmentLotDecisionSubmitted { political_business_id, .. }
            | ManualEndResultEntered { political_business_id, .. }
            | Finalized { political_business_id }
            | FinalizationReverted { political_business_id }
            | EndResultReset { political_business_id } => political_business_id,
        }
    }

    /// Short machine-readable name (snake_case) for logs.
    pub fn name(&self) -> &'static str {
        use EndResultEvent::*;
        match self {
            CountingCircleResultApplied { .. } => "counting_circle_result_applied",
            LotDecisionsSubmitted { .. } => "lot_decisions_submitted",
            MandateDistributionTriggered { .. } => "mandate_distribution_triggered",
            MandateDistributionReverted { .. } => "mandate_distribution_reverted",
            SuperApportionmentLotDecisionSubmitted { .. } => "super_apportionment_lot_decision_submitted",
            SubApportionmentLotDecisionSubmitted { .. } => "sub_apportionment_lot_decision_submitted",
            ManualEndResultEntered { .. } => "manual_end_result_entered",
            Finalized { .. } => "finalized",
            FinalizationReverted { .. } => "finalization_reverted",
            EndResultReset { .. } => "end_result_reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let json = r#"{
            "type": "lot_decisions_submitted",
            "political_business_id": "me-1",
            "decisions": [{"candidate_id": "A", "rank": 1}, {"candidate_id": "B"}]
        }"#;
        let ev: EndResultEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.name(), "lot_decisions_submitted");
        assert_eq!(ev.political_business_id().as_str(), "me-1");
        match ev {
            EndResultEvent::LotDecisionsSubmitted { list_id, decisions, .. } => {
                assert!(list_id.is_none());
                assert_eq!(decisions[1].rank, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
