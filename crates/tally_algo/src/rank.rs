//! Rank & tie resolver.
//!
//! Contract:
//! - Order by vote count ↓, current rank ↑ (unranked last), id ↑.
//! - Every member of an equal-vote group shares the rank of the group's first
//!   position ("ties share the best rank in the group").
//! - Groups of size > 1 carry `lot_decision_enabled = lot_decisions_enabled`.
//! - Total over any input; no errors.
//!
//! Tie groups for lot decisions are derived from vote counts alone, so a
//! recorded lot decision (which rewrites ranks) never hides its own group.

use serde::Serialize;

use tally_core::determinism::{sort_for_ranking, RankingKey};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankInput<K> {
    pub id: K,
    pub vote_count: u64,
    /// Rank fixed by a recorded lot decision; orders members of one tie.
    pub rank: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedEntry<K> {
    pub id: K,
    pub vote_count: u64,
    pub rank: u32,
    pub lot_decision_enabled: bool,
}

/// Entries sharing one vote count, with the rank window they compete for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TieGroup<K> {
    pub vote_count: u64,
    pub min_rank: u32,
    /// Members in ascending id order.
    pub members: Vec<K>,
}

impl<K> TieGroup<K> {
    #[inline]
    pub fn max_rank(&self) -> u32 {
        self.min_rank + self.members.len() as u32 - 1
    }

    /// The group straddles the cut line between the first `number_of_mandates`
    /// ranks and the rest, so its members cannot all share one outcome.
    #[inline]
    pub fn straddles(&self, number_of_mandates: u32) -> bool {
        self.min_rank <= number_of_mandates && self.max_rank() > number_of_mandates
    }
}

/// Compute ranks in canonical ranking order.
pub fn compute_ranks<K: Ord + Clone>(
    inputs: &[RankInput<K>],
    lot_decisions_enabled: bool,
) -> Vec<RankedEntry<K>> {
    let mut sorted: Vec<&RankInput<K>> = inputs.iter().collect();
    sort_for_ranking(&mut sorted, |x| RankingKey {
        vote_count: x.vote_count,
        rank: x.rank,
        id: &x.id,
    });

    let mut out = Vec::with_capacity(sorted.len());
    let mut i = 0usize;
    while i < sorted.len() {
        let vote_count = sorted[i].vote_count;
        let mut j = i;
        while j < sorted.len() && sorted[j].vote_count == vote_count {
            j += 1;
        }
        let group_rank = (i + 1) as u32;
        let shared = j - i > 1;
        for x in &sorted[i..j] {
            out.push(RankedEntry {
                id: x.id.clone(),
                vote_count,
                rank: group_rank,
                lot_decision_enabled: lot_decisions_enabled && shared,
            });
        }
        i = j;
    }
    out
}

/// All groups of two or more entries with equal vote counts, best group first.
pub fn tie_groups<K: Ord + Clone>(entries: &[(K, u64)]) -> Vec<TieGroup<K>> {
    let mut sorted: Vec<&(K, u64)> = entries.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut groups = Vec::new();
    let mut i = 0usize;
    while i < sorted.len() {
        let vote_count = sorted[i].1;
        let mut j = i;
        while j < sorted.len() && sorted[j].1 == vote_count {
            j += 1;
        }
        if j - i > 1 {
            groups.push(TieGroup {
                vote_count,
                min_rank: (i + 1) as u32,
                members: sorted[i..j].iter().map(|e| e.0.clone()).collect(),
            });
        }
        i = j;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(v: &[(&'static str, u64)]) -> Vec<RankInput<&'static str>> {
        v.iter().map(|&(id, vote_count)| RankInput { id, vote_count, rank: None }).collect()
    }

    fn rank_of<K: PartialEq>(ranked: &[RankedEntry<K>], id: K) -> u32 {
        ranked.iter().find(|e| e.id == id).map(|e| e.rank).unwrap()
    }

    #[test]
    fn ties_share_the_best_rank() {
        let ranked = compute_ranks(&inputs(&[("A", 100), ("B", 100), ("C", 80)]), true);
        assert_eq!(rank_of(&ranked, "A"), 1);
        assert_eq!(rank_of(&ranked, "B"), 1);
        assert_eq!(rank_of(&ranked, "C"), 3);
        assert!(ranked.iter().filter(|e| e.id != "C").all(|e| e.lot_decision_enabled));
        assert!(!ranked.iter().find(|e| e.id == "C").unwrap().lot_decision_enabled);
    }

    #[test]
    fn lot_decisions_stay_disabled_until_enabled() {
        let ranked = compute_ranks(&inputs(&[("A", 5), ("B", 5)]), false);
        assert!(ranked.iter().all(|e| !e.lot_decision_enabled));
    }

    #[test]
    fn previous_rank_orders_display_within_a_tie() {
        let mut v = inputs(&[("A", 7), ("B", 7)]);
        v[0].rank = Some(2);
        v[1].rank = Some(1);
        let ranked = compute_ranks(&v, true);
        assert_eq!(ranked[0].id, "B");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 1);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(compute_ranks::<&str>(&[], true).is_empty());
        assert!(tie_groups::<&str>(&[]).is_empty());
    }

    #[test]
    fn tie_groups_and_straddling() {
        let groups = tie_groups(&[("C", 80), ("B", 100), ("A", 100), ("D", 80), ("E", 80)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec!["A", "B"]);
        assert_eq!((groups[0].min_rank, groups[0].max_rank()), (1, 2));
        assert_eq!((groups[1].min_rank, groups[1].max_rank()), (3, 5));
        assert!(!groups[0].straddles(2));
        assert!(groups[0].straddles(1));
        assert!(groups[1].straddles(3));
        assert!(!groups[1].straddles(5));
        assert!(!groups[1].straddles(2));
    }

    proptest! {
        #[test]
        fn equal_votes_share_minimum_position(votes in proptest::collection::vec(0u64..6, 1..12)) {
            let v: Vec<RankInput<usize>> = votes.iter().enumerate()
                .map(|(id, &vote_count)| RankInput { id, vote_count, rank: None }).collect();
            let ranked = compute_ranks(&v, true);
            for e in &ranked {
                let better = votes.iter().filter(|&&x| x > e.vote_count).count() as u32;
                prop_assert_eq!(e.rank, better + 1);
            }
        }

        #[test]
        fn raising_votes_never_worsens_own_rank(
            votes in proptest::collection::vec(0u64..20, 2..10),
            who in 0usize..10,
            bump in 1u64..10,
        ) {
            let who = who % votes.len();
            let before: Vec<RankInput<usize>> = votes.iter().enumerate()
                .map(|(id, &vote_count)| RankInput { id, vote_count, rank: None }).collect();
            let mut after = before.clone();
            after[who].vote_count += bump;
            let rb = compute_ranks(&before, true);
            let ra = compute_ranks(&after, true);
            prop_assert!(rank_of(&ra, who) <= rank_of(&rb, who));
            for other in 0..votes.len() {
                if other != who {
                    prop_assert!(rank_of(&ra, other) >= rank_of(&rb, other));
                }
            }
        }
    }
}
