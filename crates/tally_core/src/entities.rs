//! Political-business configuration and per-counting-circle result snapshots.
//!
//! These are flat read-model shapes: the engine never assumes how they are
//! stored, only that a collaborator hands them over already joined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{BallotId, CandidateId, ListId, ListUnionId, PoliticalBusinessId, UnionListId};
use crate::variables::{
    DoubleProportionalQuorum, MajorityElectionMandateAlgorithm, ProportionalElectionMandateAlgorithm,
};

/* -------------------------------------------------------------------------- */
/*                                Configuration                               */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteConfig {
    pub id: PoliticalBusinessId,
    pub total_count_of_counting_circles: u32,
    pub ballots: Vec<BallotId>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MajorityElectionConfig {
    pub id: PoliticalBusinessId,
    pub number_of_mandates: u32,
    pub mandate_algorithm: MajorityElectionMandateAlgorithm,
    pub total_count_of_counting_circles: u32,
    pub candidates: Vec<CandidateId>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    pub id: ListId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_union: Option<ListUnionId>,
    /// Only meaningful inside `list_union`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_list_union: Option<ListUnionId>,
    /// Party identity across the elections of a union (biproportional columns).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union_list: Option<UnionListId>,
    pub candidates: Vec<CandidateId>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProportionalElectionConfig {
    pub id: PoliticalBusinessId,
    pub number_of_mandates: u32,
    pub mandate_algorithm: ProportionalElectionMandateAlgorithm,
    pub total_count_of_counting_circles: u32,
    #[serde(default)]
    pub quorum: DoubleProportionalQuorum,
    pub lists: Vec<ListConfig>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProportionalElectionUnionConfig {
    pub id: PoliticalBusinessId,
    pub election_ids: Vec<PoliticalBusinessId>,
    #[serde(default)]
    pub quorum: DoubleProportionalQuorum,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoliticalBusinessConfig {
    Vote(VoteConfig),
    MajorityElection(MajorityElectionConfig),
    ProportionalElection(ProportionalElectionConfig),
    ProportionalElectionUnion(ProportionalElectionUnionConfig),
}

impl PoliticalBusinessConfig {
    pub fn id(&self) -> &PoliticalBusinessId {
        match self {
            PoliticalBusinessConfig::Vote(c) => &c.id,
            PoliticalBusinessConfig::MajorityElection(c) => &c.id,
            PoliticalBusinessConfig::ProportionalElection(c) => &c.id,
            PoliticalBusinessConfig::ProportionalElectionUnion(c) => &c.id,
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                        Counting-circle result snapshots                     */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountOfVoters {
    pub received_ballots: u64,
    pub invalid_ballots: u64,
    pub blank_ballots: u64,
    pub accounted_ballots: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingCards {
    pub valid: u64,
    pub invalid: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotResult {
    pub yes: u64,
    pub no: u64,
    pub unanswered: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteResultSnapshot {
    pub count_of_voters: CountOfVoters,
    pub voting_cards: VotingCards,
    pub ballots: BTreeMap<BallotId, BallotResult>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MajorityElectionResultSnapshot {
    pub count_of_voters: CountOfVoters,
    pub voting_cards: VotingCards,
    pub candidate_votes: BTreeMap<CandidateId, u64>,
    pub individual_votes: u64,
    pub empty_votes: u64,
    pub invalid_votes: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateResult {
    pub vote_count: u64,
    /// Votes this candidate received on ballots of other lists, by list.
    pub vote_sources: BTreeMap<ListId, u64>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListResult {
    pub unmodified_lists_votes_count: u64,
    pub modified_lists_votes_count: u64,
    pub blank_rows_count: u64,
    pub candidates: BTreeMap<CandidateId, CandidateResult>,
}

impl ListResult {
    /// Party votes of the list (candidate votes on its ballots plus blank rows).
    pub fn total_vote_count(&self) -> u64 {
        self.unmodified_lists_votes_count
            .saturating_add(self.modified_lists_votes_count)
            .saturating_add(self.blank_rows_count)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProportionalElectionResultSnapshot {
    pub count_of_voters: CountOfVoters,
    pub voting_cards: VotingCards,
    pub lists: BTreeMap<ListId, ListResult>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CountingCircleResultSnapshot {
    Vote(VoteResultSnapshot),
    MajorityElection(MajorityElectionResultSnapshot),
    ProportionalElection(ProportionalElectionResultSnapshot),
}

/// Signed factor of a delta: `+1` counts a circle's contribution, `-1` retracts it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum DeltaFactor {
    Add,
    Remove,
}

impl DeltaFactor {
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            DeltaFactor::Add => 1,
            DeltaFactor::Remove => -1,
        }
    }

    #[inline]
    pub fn inverse(self) -> DeltaFactor {
        match self {
            DeltaFactor::Add => DeltaFactor::Remove,
            DeltaFactor::Remove => DeltaFactor::Add,
        }
    }
}

impl TryFrom<i8> for DeltaFactor {
    type Error = String;
    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(DeltaFactor::Add),
            -1 => Ok(DeltaFactor::Remove),
            other => Err(format!("delta factor must be 1 or -1, got {other}")),
        }
    }
}

impl From<DeltaFactor> for i8 {
    fn from(f: DeltaFactor) -> i8 {
        f.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_is_plus_or_minus_one() {
        assert_eq!(serde_json::from_str::<DeltaFactor>("-1").unwrap(), DeltaFactor::Remove);
        assert_eq!(serde_json::to_string(&DeltaFactor::Add).unwrap(), "1");
        assert!(serde_json::from_str::<DeltaFactor>("2").is_err());
        assert_eq!(DeltaFactor::Add.inverse(), DeltaFactor::Remove);
    }

    #[test]
    fn config_is_tagged_by_kind() {
        let json = r#"{
            "kind": "proportional_election",
            "id": "pe-1",
            "number_of_mandates": 5,
            "mandate_algorithm": "hagenbach_bischoff",
            "total_count_of_counting_circles": 2,
            "lists": [{ "id": "L1", "candidates": ["C1", "C2"] }]
        }"#;
        let cfg: PoliticalBusinessConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.id().as_str(), "pe-1");
        match cfg {
            PoliticalBusinessConfig::ProportionalElection(pe) => {
                assert_eq!(pe.lists[0].candidates.len(), 2);
                assert!(!pe.quorum.is_enabled());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn list_total_includes_blank_rows() {
        let l = ListResult {
            unmodified_lists_votes_count: 10,
            modified_lists_votes_count: 5,
            blank_rows_count: 2,
            ..ListResult::default()
        };
        assert_eq!(l.total_vote_count(), 17);
    }
}
