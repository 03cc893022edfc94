//! Highest-averages divisor apportionment (D'Hondt, Sainte-Laguë) over exact
//! rational weights.
//!
//! Contract:
//! - Seats are awarded one quotient level at a time: every entry whose
//!   `weight / step(seats)` equals the current maximum gets a seat, as long as
//!   the tied entries fit into the remaining seats.
//! - When more entries share the maximum than seats remain, nothing is picked:
//!   the result carries a `DivisorTie` and `resolutions` enumerates every way
//!   to hand out the open seats (lexicographic by contender order).
//! - `divisor()` returns an electoral divisor reproducing the seat counts by
//!   rounding (floor for D'Hondt, standard rounding for Sainte-Laguë).
//!
//! Determinism:
//! - Iteration follows the `BTreeMap` key order; no floating point.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::error;

use tally_core::{EngineError, EngineResult, Ratio};

use crate::combinatorics::{binomial, Combinations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisorMethod {
    /// Divisors 1, 2, 3, …
    DHondt,
    /// Divisors 1/2, 3/2, 5/2, … (standard rounding)
    SainteLague,
}

impl DivisorMethod {
    /// Divisor sequence element for an entry already holding `seats`.
    pub fn step(self, seats: u64) -> Ratio {
        match self {
            DivisorMethod::DHondt => Ratio::from_integer(seats + 1),
            DivisorMethod::SainteLague => &Ratio::from_integer(seats) + &Ratio::half(),
        }
    }
}

/// More entries share the deciding quotient than seats remain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DivisorTie<K> {
    pub contenders: Vec<K>,
    pub open_seats: u64,
    pub quotient: Ratio,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DivisorApportionment<K: Ord> {
    pub method: DivisorMethod,
    /// Seats decided without a lot; with a tie, the open seats are missing here.
    pub seats: BTreeMap<K, u64>,
    pub tie: Option<DivisorTie<K>>,
    divisor: Ratio,
}

impl<K: Ord + Clone> DivisorApportionment<K> {
    pub fn divisor(&self) -> &Ratio {
        &self.divisor
    }

    pub fn is_tied(&self) -> bool {
        self.tie.is_some()
    }

    /// The first entry of `resolutions` without enumerating the others.
    pub fn first_resolution(&self) -> BTreeMap<K, u64> {
        let mut seats = self.seats.clone();
        if let Some(tie) = &self.tie {
            for k in tie.contenders.iter().take(tie.open_seats as usize) {
                *seats.entry(k.clone()).or_insert(0) += 1;
            }
        }
        seats
    }

    /// Every complete seat assignment; a single element when there is no tie.
    pub fn resolutions(&self, max_options: usize) -> EngineResult<Vec<BTreeMap<K, u64>>> {
        let Some(tie) = &self.tie else {
            return Ok(vec![self.seats.clone()]);
        };
        let n = tie.contenders.len() as u64;
        let count = binomial(n, tie.open_seats);
        if count.map_or(true, |c| c > max_options as u64) {
            let msg = format!(
                "divisor tie among {n} entries for {} seats exceeds {max_options} lot decision options",
                tie.open_seats
            );
            error!(target: "tally_algo::divisor", "{msg}");
            return Err(EngineError::invariant(msg));
        }

        let mut out = Vec::new();
        for pick in Combinations::new(tie.contenders.len(), tie.open_seats as usize) {
            let mut seats = self.seats.clone();
            for i in pick {
                *seats.entry(tie.contenders[i].clone()).or_insert(0) += 1;
            }
            out.push(seats);
        }
        Ok(out)
    }
}

/// Apportion `seats` over `weights` with the given method.
///
/// Entries with zero weight only receive seats when every quotient is zero,
/// which surfaces as a tie among all of them.
pub fn apportion<K: Ord + Clone>(
    method: DivisorMethod,
    weights: &BTreeMap<K, Ratio>,
    seats: u64,
) -> DivisorApportionment<K> {
    let mut alloc: BTreeMap<K, u64> = weights.keys().cloned().map(|k| (k, 0)).collect();
    let mut remaining = seats;
    let mut last_awarded: Option<Ratio> = None;
    let mut tie = None;

    while remaining > 0 {
        let Some((best, tied)) = max_quotient(method, weights, &alloc) else {
            break;
        };
        if tied.len() as u64 > remaining {
            tie = Some(DivisorTie { contenders: tied, open_seats: remaining, quotient: best });
            break;
        }
        remaining -= tied.len() as u64;
        for k in tied {
            *alloc.entry(k).or_insert(0) += 1;
        }
        last_awarded = Some(best);
    }

    let divisor = match (&tie, &last_awarded) {
        (Some(t), _) => t.quotient.clone(),
        (None, Some(last)) => match max_quotient(method, weights, &alloc) {
            Some((next, _)) => Ratio::midpoint(last, &next),
            None => last.clone(),
        },
        (None, None) => match max_quotient(method, weights, &alloc) {
            Some((next, _)) if next.is_positive() => &next + &next,
            _ => Ratio::one(),
        },
    };

    DivisorApportionment { method, seats: alloc, tie, divisor }
}

/// Maximum quotient and every key reaching it, in key order.
fn max_quotient<K: Ord + Clone>(
    method: DivisorMethod,
    weights: &BTreeMap<K, Ratio>,
    alloc: &BTreeMap<K, u64>,
) -> Option<(Ratio, Vec<K>)> {
    let mut best: Option<(Ratio, Vec<K>)> = None;
    for (k, w) in weights {
        let s = alloc.get(k).copied().unwrap_or(0);
        let q = w / &method.step(s);
        match best.as_ref().map(|(b, _)| q.cmp(b)) {
            None | Some(core::cmp::Ordering::Greater) => best = Some((q, vec![k.clone()])),
            Some(core::cmp::Ordering::Equal) => {
                if let Some((_, ids)) = best.as_mut() {
                    ids.push(k.clone());
                }
            }
            Some(core::cmp::Ordering::Less) => {}
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::rounding::StandardRounding;

    fn w(v: &[(&'static str, u64)]) -> BTreeMap<&'static str, Ratio> {
        v.iter().map(|&(k, x)| (k, Ratio::from_integer(x))).collect()
    }

    #[test]
    fn two_lists_five_seats() {
        for method in [DivisorMethod::DHondt, DivisorMethod::SainteLague] {
            let a = apportion(method, &w(&[("L1", 600), ("L2", 400)]), 5);
            assert!(!a.is_tied());
            assert_eq!(a.seats["L1"], 3);
            assert_eq!(a.seats["L2"], 2);
        }
    }

    #[test]
    fn sainte_lague_divisor_reproduces_seats() {
        let weights = w(&[("A", 5100), ("B", 2900), ("C", 1300), ("D", 700)]);
        let a = apportion(DivisorMethod::SainteLague, &weights, 10);
        assert_eq!(a.seats.values().sum::<u64>(), 10);
        for (k, v) in &weights {
            let q = v.checked_div(a.divisor()).unwrap();
            assert_eq!(q.standard_rounding(), Some(StandardRounding::Exact(a.seats[k])));
        }
    }

    #[test]
    fn exact_tie_for_last_seat_is_reported() {
        let a = apportion(DivisorMethod::SainteLague, &w(&[("A", 100), ("B", 100)]), 1);
        let tie = a.tie.clone().unwrap();
        assert_eq!(tie.contenders, vec!["A", "B"]);
        assert_eq!(tie.open_seats, 1);
        assert_eq!(a.seats.values().sum::<u64>(), 0);

        let options = a.resolutions(1000).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0]["A"], 1);
        assert_eq!(options[1]["B"], 1);
        assert!(a.resolutions(1).is_err());
    }

    #[test]
    fn zero_seats_and_empty_input() {
        let a = apportion(DivisorMethod::DHondt, &w(&[("A", 10)]), 0);
        assert_eq!(a.seats["A"], 0);
        assert_eq!(*a.divisor(), Ratio::from_integer(20));
        let e = apportion::<&str>(DivisorMethod::DHondt, &BTreeMap::new(), 3);
        assert!(e.seats.is_empty());
        assert_eq!(*e.divisor(), Ratio::one());
    }
}
