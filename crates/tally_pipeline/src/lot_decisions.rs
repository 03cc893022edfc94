//! Available lot decisions: what an operator may (or must) decide right now.

use serde::Serialize;

use tally_algo::allocation::biproportional::{
    DoubleProportionalResult, SubApportionmentLotDecision, SuperApportionmentLotDecision,
};
use tally_core::ids::{CandidateId, ListId, PoliticalBusinessId, UnionListId};

use crate::candidates::{current_tie_groups, CandidateEndResult, CutLine};

/// One tie group with the rank window its members compete for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AvailableTieGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
    pub vote_count: u64,
    pub min_rank: u32,
    pub max_rank: u32,
    /// The group straddles the mandate cut line and blocks finalization.
    pub required: bool,
    pub candidates: Vec<CandidateId>,
}

/// Options of an open biproportional tie, numbered from 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum AvailableApportionmentLotDecisions<C> {
    SuperApportionment { options: Vec<SuperApportionmentLotDecision<PoliticalBusinessId, C>> },
    SubApportionment { options: Vec<SubApportionmentLotDecision<PoliticalBusinessId, C>> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AvailableLotDecisions {
    pub political_business_id: PoliticalBusinessId,
    pub tie_groups: Vec<AvailableTieGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_apportionment: Option<AvailableApportionmentLotDecisions<ListId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub union_apportionment: Option<AvailableApportionmentLotDecisions<UnionListId>>,
}

impl AvailableLotDecisions {
    pub fn empty(political_business_id: PoliticalBusinessId) -> Self {
        AvailableLotDecisions {
            political_business_id,
            tie_groups: Vec::new(),
            list_apportionment: None,
            union_apportionment: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tie_groups.is_empty()
            && self.list_apportionment.is_none()
            && self.union_apportionment.is_none()
    }
}

/// Enabled tie groups of one candidate list. `cut` marks the groups that
/// need a decision as required.
pub(crate) fn tie_groups_of(
    list_id: Option<&ListId>,
    candidates: &[CandidateEndResult],
    cut: Option<CutLine>,
) -> Vec<AvailableTieGroup> {
    if !candidates.iter().any(|c| c.lot_decision_enabled) {
        return Vec::new();
    }
    current_tie_groups(candidates)
        .into_iter()
        .map(|g| AvailableTieGroup {
            list_id: list_id.cloned(),
            vote_count: g.vote_count,
            min_rank: g.min_rank,
            max_rank: g.max_rank(),
            required: cut.is_some_and(|c| c.requires_decision(&g)),
            candidates: g.members,
        })
        .collect()
}

/// The open stage of a biproportional result, if any.
pub(crate) fn apportionment_options<C: Clone>(
    dp: &DoubleProportionalResult<PoliticalBusinessId, C>,
) -> Option<AvailableApportionmentLotDecisions<C>> {
    if !dp.super_apportionment_lot_decisions.is_empty()
        && dp.super_apportionment_lot_decision_number.is_none()
    {
        return Some(AvailableApportionmentLotDecisions::SuperApportionment {
            options: dp.super_apportionment_lot_decisions.clone(),
        });
    }
    if !dp.sub_apportionment_lot_decisions.is_empty()
        && dp.sub_apportionment_lot_decision_number.is_none()
    {
        return Some(AvailableApportionmentLotDecisions::SubApportionment {
            options: dp.sub_apportionment_lot_decisions.clone(),
        });
    }
    None
}
