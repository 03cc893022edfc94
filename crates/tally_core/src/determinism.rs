//! Determinism utilities: the one canonical order for ranked entries.
//!
//! Ranking display order is **always** `(vote_count ↓, current rank ↑, id ↑)`
//! with unranked entries after ranked ones. The id key only stabilises the
//! display; it never decides an election outcome (ties go to lot decisions).

use core::cmp::Ordering;

/// Borrowed sort key of one ranked entry.
#[derive(Clone, Copy, Debug)]
pub struct RankingKey<'a, K> {
    pub vote_count: u64,
    pub rank: Option<u32>,
    pub id: &'a K,
}

/// Compare two ranking keys in canonical ranking order.
#[inline]
pub fn cmp_ranking<K: Ord>(a: &RankingKey<'_, K>, b: &RankingKey<'_, K>) -> Ordering {
    b.vote_count
        .cmp(&a.vote_count)
        .then_with(|| match (a.rank, b.rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(b.id))
}

/// Sort a slice **in place** into canonical ranking order.
#[inline]
pub fn sort_for_ranking<T, K: Ord>(xs: &mut [T], key: impl Fn(&T) -> RankingKey<'_, K>) {
    xs.sort_by(|a, b| cmp_ranking(&key(a), &key(b)));
}
