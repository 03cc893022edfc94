//! Retracting every counting-circle delta restores the initial end results.

use std::collections::BTreeMap;

use proptest::prelude::*;

use tally_core::entities::{
    BallotResult, CandidateResult, CountOfVoters, CountingCircleResultSnapshot, DeltaFactor,
    ListResult, MajorityElectionResultSnapshot, PoliticalBusinessConfig,
    ProportionalElectionResultSnapshot, VoteResultSnapshot,
};
use tally_core::events::EndResultEvent;
use tally_core::ids::{CountingCircleId, ListId};
use tally_core::variables::EngineParams;
use tally_pipeline::EndResultSet;

fn configs(circles: usize) -> Vec<PoliticalBusinessConfig> {
    serde_json::from_value(serde_json::json!([
        { "kind": "vote", "id": "v-1", "total_count_of_counting_circles": circles, "ballots": ["b-1"] },
        { "kind": "majority_election", "id": "me-1", "number_of_mandates": 2,
          "mandate_algorithm": "absolute_majority", "total_count_of_counting_circles": circles,
          "candidates": ["A", "B", "C"] },
        { "kind": "proportional_election", "id": "pe-1", "number_of_mandates": 3,
          "mandate_algorithm": "hagenbach_bischoff", "total_count_of_counting_circles": circles,
          "lists": [ { "id": "L1", "candidates": ["L1a", "L1b"] },
                     { "id": "L2", "candidates": ["L2a", "L2b"] } ] }
    ]))
    .unwrap()
}

#[derive(Clone, Debug)]
struct Circle {
    yes_no: (u64, u64),
    candidates: [u64; 3],
    lists: [(u64, u64); 2],
}

fn circle() -> impl Strategy<Value = Circle> {
    (
        (0u64..1_000, 0u64..1_000),
        prop::array::uniform3(0u64..500),
        prop::array::uniform2((1u64..500, 0u64..500)),
    )
        .prop_map(|(yes_no, candidates, lists)| Circle { yes_no, candidates, lists })
}

fn events(index: usize, c: &Circle, factor: DeltaFactor) -> Vec<EndResultEvent> {
    let cc: CountingCircleId = format!("cc-{index}").parse().unwrap();
    let applied = |pb: &str, result: CountingCircleResultSnapshot| {
        EndResultEvent::CountingCircleResultApplied {
            political_business_id: pb.parse().unwrap(),
            counting_circle_id: cc.clone(),
            factor,
            done_state_changed: true,
            result,
        }
    };
    let voters = CountOfVoters {
        received_ballots: c.yes_no.0 + c.yes_no.1,
        accounted_ballots: c.yes_no.0 + c.yes_no.1,
        ..CountOfVoters::default()
    };

    let vote = VoteResultSnapshot {
        count_of_voters: voters,
        ballots: BTreeMap::from([(
            "b-1".parse().unwrap(),
            BallotResult { yes: c.yes_no.0, no: c.yes_no.1, unanswered: 0 },
        )]),
        ..VoteResultSnapshot::default()
    };
    let majority = MajorityElectionResultSnapshot {
        candidate_votes: ["A", "B", "C"]
            .iter()
            .zip(c.candidates)
            .map(|(id, v)| (id.parse().unwrap(), v))
            .collect(),
        empty_votes: 1,
        ..MajorityElectionResultSnapshot::default()
    };
    let lists: BTreeMap<ListId, ListResult> = ["L1", "L2"]
        .iter()
        .zip(c.lists)
        .map(|(id, (unmodified, modified))| {
            let list = ListResult {
                unmodified_lists_votes_count: unmodified,
                modified_lists_votes_count: modified,
                candidates: BTreeMap::from([(
                    format!("{id}a").parse().unwrap(),
                    CandidateResult {
                        vote_count: unmodified,
                        vote_sources: BTreeMap::from([("L0".parse().unwrap(), modified)]),
                    },
                )]),
                ..ListResult::default()
            };
            (id.parse().unwrap(), list)
        })
        .collect();
    let proportional = ProportionalElectionResultSnapshot { lists, ..Default::default() };

    vec![
        applied("v-1", CountingCircleResultSnapshot::Vote(vote)),
        applied("me-1", CountingCircleResultSnapshot::MajorityElection(majority)),
        applied("pe-1", CountingCircleResultSnapshot::ProportionalElection(proportional)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn retracting_all_circles_restores_fresh_end_results(
        circles in prop::collection::vec(circle(), 1..4),
        order in any::<u64>(),
    ) {
        let fresh = EndResultSet::new(EngineParams::default(), configs(circles.len())).unwrap();
        let mut set = fresh.clone();
        for (i, c) in circles.iter().enumerate() {
            for ev in events(i, c, DeltaFactor::Add) {
                set.apply(&ev).unwrap();
            }
        }
        prop_assert_ne!(&set, &fresh);

        // retract in a rotated order
        let n = circles.len();
        let start = (order % n as u64) as usize;
        for k in 0..n {
            let i = (start + k) % n;
            for ev in events(i, &circles[i], DeltaFactor::Remove) {
                set.apply(&ev).unwrap();
            }
        }
        prop_assert_eq!(set, fresh);
    }

    #[test]
    fn over_retraction_is_rejected_without_changes(c in circle()) {
        let mut set = EndResultSet::new(EngineParams::default(), configs(1)).unwrap();
        for ev in events(0, &c, DeltaFactor::Add) {
            set.apply(&ev).unwrap();
        }
        let doubled = Circle {
            candidates: c.candidates.map(|v| v + 1),
            ..c.clone()
        };
        let before = set.clone();
        let ev = &events(0, &doubled, DeltaFactor::Remove)[1];
        let err = set.apply(ev).unwrap_err();
        prop_assert!(err.is_invariant_violation());
        prop_assert_eq!(set, before);
    }
}
