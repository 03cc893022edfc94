//! Biproportional (double-proportional) apportionment.
//!
//! Rows are subdivisions (the election itself, or the member elections of a
//! union); columns are list groups.
//!
//! Super-apportionment:
//! - Columns below the quorum are excluded.
//! - Row seats are either fixed or apportioned by Sainte-Laguë over row vote
//!   totals.
//! - Column seats are apportioned by Sainte-Laguë over voter numbers
//!   `Σ_r votes(r, c) / seats(r)` (fixed rows) or raw vote totals
//!   (apportioned rows).
//! - Ties in either apportionment are enumerated as numbered options
//!   (rows × columns, numbered from 1); nothing is distributed until one is
//!   chosen.
//!
//! Sub-apportionment (tie-and-transfer):
//! - Seats are `round(votes / (row divisor × column divisor))` with standard
//!   rounding; cells exactly half-way may round either way.
//! - Start from per-column Sainte-Laguë with unit row divisors, then move
//!   seats along flexible cells from over- to under-represented rows, scaling
//!   divisors when no such path exists.
//! - At the final divisors every matrix reproducing all row and column sums
//!   is enumerated; more than one is a sub-apportionment lot decision.
//!
//! Every quotient is an exact `Ratio`; sums are checked in integers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Display;

use serde::Serialize;
use tracing::{debug, error};

use tally_core::rounding::{ge_percent, StandardRounding};
use tally_core::variables::DoubleProportionalQuorum;
use tally_core::{EngineError, EngineResult, Ratio};

use crate::allocation::divisor::{apportion, DivisorMethod};
use crate::combinatorics::UniquePermutations;

/// How the seats of each subdivision are determined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubdivisionSeats<R: Ord> {
    Fixed(BTreeMap<R, u64>),
    Apportioned { total: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiproportionalInput<R: Ord, C: Ord> {
    /// `row → column → votes`.
    pub votes: BTreeMap<R, BTreeMap<C, u64>>,
    pub rows: SubdivisionSeats<R>,
    pub quorum: DoubleProportionalQuorum,
    pub max_lot_decision_options: usize,
    pub max_tie_and_transfer_steps: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeatCount<K> {
    pub id: K,
    pub number_of_mandates: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuperApportionmentLotDecision<R, C> {
    pub number: u32,
    pub rows: Vec<SeatCount<R>>,
    pub columns: Vec<SeatCount<C>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CellSeats<R, C> {
    pub row: R,
    pub column: C,
    pub number_of_mandates: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubApportionmentLotDecision<R, C> {
    pub number: u32,
    /// Seats of every cell of the sub-apportioned matrix.
    pub cells: Vec<CellSeats<R, C>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DpRow<R> {
    pub id: R,
    pub vote_count: u64,
    pub number_of_mandates: u64,
    pub divisor: Option<Ratio>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DpColumn<C> {
    pub id: C,
    pub vote_count: u64,
    pub voter_number: Ratio,
    pub quorum_reached: bool,
    pub number_of_mandates: u64,
    pub divisor: Option<Ratio>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DpCell<R, C> {
    pub row: R,
    pub column: C,
    pub vote_count: u64,
    /// First solution found by tie-and-transfer, before any lot decision.
    pub provisional_number_of_mandates: u64,
    pub number_of_mandates: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DoubleProportionalResult<R, C> {
    pub number_of_mandates: u64,
    pub rows: Vec<DpRow<R>>,
    pub columns: Vec<DpColumn<C>>,
    pub cells: Vec<DpCell<R, C>>,
    pub super_apportionment_divisor: Option<Ratio>,
    pub super_apportionment_lot_decisions: Vec<SuperApportionmentLotDecision<R, C>>,
    pub super_apportionment_lot_decision_number: Option<u32>,
    pub sub_apportionment_lot_decisions: Vec<SubApportionmentLotDecision<R, C>>,
    pub sub_apportionment_lot_decision_number: Option<u32>,
    pub all_number_of_mandates_distributed: bool,
}

impl<R, C> DoubleProportionalResult<R, C>
where
    R: Ord + Clone + Display,
    C: Ord + Clone + Display,
{
    /// Run both stages; stops after the super-apportionment when it is tied.
    pub fn calculate(input: &BiproportionalInput<R, C>) -> EngineResult<Self> {
        let mut result = Self::super_apportionment(input)?;
        if result.super_apportionment_lot_decisions.is_empty() {
            result.sub_apportionment(input)?;
        }
        Ok(result)
    }

    /// Recalculate with super-apportionment option `number` and continue with
    /// the sub-apportionment.
    pub fn apply_super_apportionment_lot_decision(
        input: &BiproportionalInput<R, C>,
        number: u32,
    ) -> EngineResult<Self> {
        let mut result = Self::super_apportionment(input)?;
        if result.super_apportionment_lot_decisions.is_empty() {
            return Err(EngineError::validation("no super apportionment lot decision is open"));
        }
        let Some(decision) = result
            .super_apportionment_lot_decisions
            .iter()
            .find(|d| d.number == number)
            .cloned()
        else {
            return Err(EngineError::validation(format!(
                "super apportionment lot decision {number} does not exist"
            )));
        };

        for (row, s) in result.rows.iter_mut().zip(&decision.rows) {
            row.number_of_mandates = s.number_of_mandates;
        }
        for (col, s) in result.columns.iter_mut().zip(&decision.columns) {
            col.number_of_mandates = s.number_of_mandates;
        }
        result.super_apportionment_lot_decision_number = Some(number);
        result.sub_apportionment(input)?;
        Ok(result)
    }

    /// Pick sub-apportionment option `number`.
    pub fn apply_sub_apportionment_lot_decision(&mut self, number: u32) -> EngineResult<()> {
        if self.sub_apportionment_lot_decisions.is_empty() {
            return Err(EngineError::validation("no sub apportionment lot decision is open"));
        }
        let Some(decision) =
            self.sub_apportionment_lot_decisions.iter().find(|d| d.number == number)
        else {
            return Err(EngineError::validation(format!(
                "sub apportionment lot decision {number} does not exist"
            )));
        };

        let chosen: BTreeMap<(&R, &C), u64> = decision
            .cells
            .iter()
            .map(|c| ((&c.row, &c.column), c.number_of_mandates))
            .collect();
        let seats: Vec<u64> = self
            .cells
            .iter()
            .map(|c| chosen.get(&(&c.row, &c.column)).copied().unwrap_or(0))
            .collect();
        for (cell, s) in self.cells.iter_mut().zip(seats) {
            cell.number_of_mandates = s;
        }
        self.sub_apportionment_lot_decision_number = Some(number);
        self.all_number_of_mandates_distributed = true;
        Ok(())
    }

    /// A lot decision exists whose option has not been chosen yet.
    pub fn has_open_lot_decisions(&self) -> bool {
        (!self.super_apportionment_lot_decisions.is_empty()
            && self.super_apportionment_lot_decision_number.is_none())
            || (!self.sub_apportionment_lot_decisions.is_empty()
                && self.sub_apportionment_lot_decision_number.is_none())
    }

    /// Final seats per column (super-apportionment result).
    pub fn column_seats(&self) -> BTreeMap<C, u64> {
        self.columns.iter().map(|c| (c.id.clone(), c.number_of_mandates)).collect()
    }

    /// Final seats of the cells of `row`.
    pub fn row_cells(&self, row: &R) -> BTreeMap<C, u64> {
        self.cells
            .iter()
            .filter(|c| &c.row == row)
            .map(|c| (c.column.clone(), c.number_of_mandates))
            .collect()
    }

    fn super_apportionment(input: &BiproportionalInput<R, C>) -> EngineResult<Self> {
        let mut row_ids: BTreeSet<R> = input.votes.keys().cloned().collect();
        if let SubdivisionSeats::Fixed(seats) = &input.rows {
            row_ids.extend(seats.keys().cloned());
        }
        let column_ids: BTreeSet<C> =
            input.votes.values().flat_map(|cols| cols.keys().cloned()).collect();
        let vote = |r: &R, c: &C| input.votes.get(r).and_then(|m| m.get(c)).copied().unwrap_or(0);

        let row_totals: BTreeMap<R, u64> = row_ids
            .iter()
            .map(|r| (r.clone(), column_ids.iter().map(|c| vote(r, c)).sum()))
            .collect();
        let grand_total: u64 = row_totals.values().sum();

        let quorum_reached = |c: &C| -> bool {
            let q = &input.quorum;
            if !q.is_enabled() {
                return true;
            }
            let any = q.any_subdivision_pct.is_some_and(|pct| {
                row_ids.iter().any(|r| ge_percent(vote(r, c), row_totals[r], pct))
            });
            let total = q.total_pct.is_some_and(|pct| {
                ge_percent(row_ids.iter().map(|r| vote(r, c)).sum(), grand_total, pct)
            });
            any || total
        };

        let mut rows: Vec<DpRow<R>> = row_ids
            .iter()
            .map(|r| DpRow { id: r.clone(), vote_count: row_totals[r], number_of_mandates: 0, divisor: None })
            .collect();

        // Row seat options.
        let row_options: Vec<BTreeMap<R, u64>> = match &input.rows {
            SubdivisionSeats::Fixed(seats) => vec![row_ids
                .iter()
                .map(|r| (r.clone(), seats.get(r).copied().unwrap_or(0)))
                .collect()],
            SubdivisionSeats::Apportioned { total } => {
                let weights: BTreeMap<R, Ratio> = row_ids
                    .iter()
                    .map(|r| {
                        let eligible: u64 =
                            column_ids.iter().filter(|&c| quorum_reached(c)).map(|c| vote(r, c)).sum();
                        (r.clone(), Ratio::from_integer(eligible))
                    })
                    .collect();
                apportion(DivisorMethod::SainteLague, &weights, *total)
                    .resolutions(input.max_lot_decision_options)?
            }
        };
        let number_of_mandates: u64 = row_options.first().map_or(0, |o| o.values().sum());

        // Column voter numbers and seat options.
        let mut columns = Vec::with_capacity(column_ids.len());
        let mut weights: BTreeMap<C, Ratio> = BTreeMap::new();
        for c in &column_ids {
            let reached = quorum_reached(c);
            let voter_number = match &input.rows {
                SubdivisionSeats::Fixed(seats) => {
                    let mut acc = Ratio::zero();
                    for r in &row_ids {
                        let m = seats.get(r).copied().unwrap_or(0);
                        if m > 0 {
                            acc = &acc + &(&Ratio::from_integer(vote(r, c)) / &Ratio::from_integer(m));
                        }
                    }
                    acc
                }
                SubdivisionSeats::Apportioned { .. } => {
                    Ratio::from_integer(row_ids.iter().map(|r| vote(r, c)).sum())
                }
            };
            if reached {
                weights.insert(c.clone(), voter_number.clone());
            }
            columns.push(DpColumn {
                id: c.clone(),
                vote_count: row_ids.iter().map(|r| vote(r, c)).sum(),
                voter_number,
                quorum_reached: reached,
                number_of_mandates: 0,
                divisor: None,
            });
        }
        if number_of_mandates > 0 && weights.values().all(Ratio::is_zero) {
            return Err(EngineError::validation(
                "no list group with votes reached the quorum",
            ));
        }
        let column_apportionment = apportion(DivisorMethod::SainteLague, &weights, number_of_mandates);
        let column_options = column_apportionment.resolutions(input.max_lot_decision_options)?;

        let cells = row_ids
            .iter()
            .flat_map(|r| {
                column_ids.iter().map(move |c| (r.clone(), c.clone()))
            })
            .map(|(r, c)| {
                let vote_count = vote(&r, &c);
                DpCell { row: r, column: c, vote_count, provisional_number_of_mandates: 0, number_of_mandates: 0 }
            })
            .collect();

        let mut result = DoubleProportionalResult {
            number_of_mandates,
            rows: Vec::new(),
            columns: Vec::new(),
            cells,
            super_apportionment_divisor: Some(column_apportionment.divisor().clone()),
            super_apportionment_lot_decisions: Vec::new(),
            super_apportionment_lot_decision_number: None,
            sub_apportionment_lot_decisions: Vec::new(),
            sub_apportionment_lot_decision_number: None,
            all_number_of_mandates_distributed: false,
        };

        let option_count = row_options.len().saturating_mul(column_options.len());
        if option_count > input.max_lot_decision_options {
            let msg = format!(
                "super apportionment has {option_count} lot decision options, limit is {}",
                input.max_lot_decision_options
            );
            error!(target: "tally_algo::biproportional", "{msg}");
            return Err(EngineError::invariant(msg));
        }

        if option_count == 1 {
            for row in &mut rows {
                row.number_of_mandates = row_options[0].get(&row.id).copied().unwrap_or(0);
            }
            for col in &mut columns {
                col.number_of_mandates = column_options[0].get(&col.id).copied().unwrap_or(0);
            }
        } else {
            let mut number = 0u32;
            for ro in &row_options {
                for co in &column_options {
                    number += 1;
                    result.super_apportionment_lot_decisions.push(SuperApportionmentLotDecision {
                        number,
                        rows: rows
                            .iter()
                            .map(|r| SeatCount { id: r.id.clone(), number_of_mandates: ro.get(&r.id).copied().unwrap_or(0) })
                            .collect(),
                        columns: columns
                            .iter()
                            .map(|c| SeatCount { id: c.id.clone(), number_of_mandates: co.get(&c.id).copied().unwrap_or(0) })
                            .collect(),
                    });
                }
            }
        }

        result.rows = rows;
        result.columns = columns;
        Ok(result)
    }

    fn sub_apportionment(&mut self, input: &BiproportionalInput<R, C>) -> EngineResult<()> {
        let row_sum: u64 = self.rows.iter().map(|r| r.number_of_mandates).sum();
        let col_sum: u64 = self.columns.iter().map(|c| c.number_of_mandates).sum();
        if row_sum != col_sum {
            let msg = format!("row seats {row_sum} differ from column seats {col_sum}");
            error!(target: "tally_algo::biproportional", "{msg}");
            return Err(EngineError::invariant(msg));
        }

        let active_rows: Vec<usize> =
            (0..self.rows.len()).filter(|&i| self.rows[i].number_of_mandates > 0).collect();
        let active_cols: Vec<usize> =
            (0..self.columns.len()).filter(|&j| self.columns[j].number_of_mandates > 0).collect();
        let ncols = self.columns.len();

        let v: Vec<Vec<u64>> = active_rows
            .iter()
            .map(|&i| active_cols.iter().map(|&j| self.cells[i * ncols + j].vote_count).collect())
            .collect();
        let r: Vec<u64> = active_rows.iter().map(|&i| self.rows[i].number_of_mandates).collect();
        let c: Vec<u64> = active_cols.iter().map(|&j| self.columns[j].number_of_mandates).collect();

        let solved = tie_and_transfer(&v, &r, &c, input.max_tie_and_transfer_steps)?;
        let solutions = enumerate_solutions(&v, &solved, &r, &c, input.max_lot_decision_options)?;

        for (ai, &i) in active_rows.iter().enumerate() {
            self.rows[i].divisor = Some(solved.row_divisors[ai].clone());
            for (aj, &j) in active_cols.iter().enumerate() {
                self.cells[i * ncols + j].provisional_number_of_mandates = solved.seats[ai][aj];
            }
        }
        for (aj, &j) in active_cols.iter().enumerate() {
            self.columns[j].divisor = Some(solved.column_divisors[aj].clone());
        }

        if solutions.len() == 1 {
            for (ai, &i) in active_rows.iter().enumerate() {
                for (aj, &j) in active_cols.iter().enumerate() {
                    self.cells[i * ncols + j].number_of_mandates = solutions[0][ai][aj];
                }
            }
            self.all_number_of_mandates_distributed = true;
            return Ok(());
        }

        for (k, sol) in solutions.iter().enumerate() {
            let mut cells = Vec::new();
            for (ai, &i) in active_rows.iter().enumerate() {
                for (aj, &j) in active_cols.iter().enumerate() {
                    cells.push(CellSeats {
                        row: self.rows[i].id.clone(),
                        column: self.columns[j].id.clone(),
                        number_of_mandates: sol[ai][aj],
                    });
                }
            }
            self.sub_apportionment_lot_decisions.push(SubApportionmentLotDecision {
                number: k as u32 + 1,
                cells,
            });
        }
        Ok(())
    }
}

struct Solved {
    row_divisors: Vec<Ratio>,
    column_divisors: Vec<Ratio>,
    seats: Vec<Vec<u64>>,
}

impl Solved {
    fn quotient(&self, v: &[Vec<u64>], i: usize, j: usize) -> Ratio {
        &Ratio::from_integer(v[i][j]) / &(&self.row_divisors[i] * &self.column_divisors[j])
    }
}

fn half_below(n: u64) -> Ratio {
    &Ratio::from_integer(n) - &Ratio::half()
}

fn half_above(n: u64) -> Ratio {
    &Ratio::from_integer(n) + &Ratio::half()
}

fn tie_and_transfer(v: &[Vec<u64>], r: &[u64], c: &[u64], max_steps: usize) -> EngineResult<Solved> {
    let nr = r.len();
    let nc = c.len();
    let mut s = Solved {
        row_divisors: vec![Ratio::one(); nr],
        column_divisors: Vec::with_capacity(nc),
        seats: vec![vec![0; nc]; nr],
    };

    for j in 0..nc {
        let weights: BTreeMap<usize, Ratio> = (0..nr).map(|i| (i, Ratio::from_integer(v[i][j]))).collect();
        let ap = apportion(DivisorMethod::SainteLague, &weights, c[j]);
        for (i, n) in ap.first_resolution() {
            s.seats[i][j] = n;
        }
        s.column_divisors.push(ap.divisor().clone());
    }

    let down = |s: &Solved, i: usize, j: usize| {
        s.seats[i][j] >= 1 && s.quotient(v, i, j) == half_below(s.seats[i][j])
    };
    let up = |s: &Solved, i: usize, j: usize| v[i][j] > 0 && s.quotient(v, i, j) == half_above(s.seats[i][j]);

    for step in 0..max_steps {
        let excess: Vec<i128> = (0..nr)
            .map(|i| s.seats[i].iter().map(|&n| n as i128).sum::<i128>() - r[i] as i128)
            .collect();
        if excess.iter().all(|&d| d == 0) {
            return Ok(s);
        }

        // Labels: rows reached via a column (None for roots), columns via a row.
        let mut row_pred: Vec<Option<Option<usize>>> = vec![None; nr];
        let mut col_pred: Vec<Option<usize>> = vec![None; nc];
        let mut queue = VecDeque::new();
        for i in (0..nr).filter(|&i| excess[i] > 0) {
            row_pred[i] = Some(None);
            queue.push_back(i);
        }

        let mut target = None;
        'search: while let Some(i) = queue.pop_front() {
            for j in 0..nc {
                if col_pred[j].is_some() || !down(&s, i, j) {
                    continue;
                }
                col_pred[j] = Some(i);
                for k in 0..nr {
                    if row_pred[k].is_some() || !up(&s, k, j) {
                        continue;
                    }
                    row_pred[k] = Some(Some(j));
                    if excess[k] < 0 {
                        target = Some(k);
                        break 'search;
                    }
                    queue.push_back(k);
                }
            }
        }

        if let Some(mut k) = target {
            while let Some(Some(j)) = row_pred[k] {
                let Some(i) = col_pred[j] else {
                    return Err(EngineError::invariant("broken transfer path"));
                };
                s.seats[k][j] += 1;
                s.seats[i][j] -= 1;
                k = i;
            }
            debug!(target: "tally_algo::biproportional", step, "transfer");
            continue;
        }

        let mut lambda: Option<Ratio> = None;
        for i in 0..nr {
            for j in 0..nc {
                let (ri, cj) = (row_pred[i].is_some(), col_pred[j].is_some());
                let n = s.seats[i][j];
                let candidate = if ri && !cj && n >= 1 {
                    s.quotient(v, i, j).checked_div(&half_below(n))
                } else if !ri && cj && v[i][j] > 0 {
                    half_above(n).checked_div(&s.quotient(v, i, j))
                } else {
                    None
                };
                if let Some(x) = candidate {
                    if lambda.as_ref().map_or(true, |l| x < *l) {
                        lambda = Some(x);
                    }
                }
            }
        }
        let Some(lambda) = lambda else {
            return Err(EngineError::validation(
                "no biproportional apportionment exists for the given seats",
            ));
        };
        debug!(target: "tally_algo::biproportional", step, lambda = %lambda, "scale divisors");
        for i in (0..nr).filter(|&i| row_pred[i].is_some()) {
            s.row_divisors[i] = &s.row_divisors[i] * &lambda;
        }
        for j in (0..nc).filter(|&j| col_pred[j].is_some()) {
            s.column_divisors[j] = &s.column_divisors[j] / &lambda;
        }
    }

    let msg = format!("tie-and-transfer did not converge within {max_steps} steps");
    error!(target: "tally_algo::biproportional", "{msg}");
    Err(EngineError::invariant(msg))
}

/// Every matrix rounding the final quotients that reproduces all sums.
fn enumerate_solutions(
    v: &[Vec<u64>],
    solved: &Solved,
    r: &[u64],
    c: &[u64],
    max_options: usize,
) -> EngineResult<Vec<Vec<Vec<u64>>>> {
    let nr = r.len();
    let nc = c.len();
    let mut base = vec![vec![0u64; nc]; nr];
    let mut tied: Vec<Vec<usize>> = vec![Vec::new(); nr];

    for i in 0..nr {
        for j in 0..nc {
            if v[i][j] == 0 {
                continue;
            }
            match solved.quotient(v, i, j).standard_rounding() {
                Some(StandardRounding::Exact(n)) => base[i][j] = n,
                Some(StandardRounding::Tie { lower }) => {
                    base[i][j] = lower;
                    tied[i].push(j);
                }
                None => return Err(EngineError::invariant("negative biproportional quotient")),
            }
        }
    }

    let mut row_need = Vec::with_capacity(nr);
    for i in 0..nr {
        let have: u64 = base[i].iter().sum();
        match r[i].checked_sub(have) {
            Some(x) if x as usize <= tied[i].len() => row_need.push(x as usize),
            _ => {
                let msg = format!("row {i} cannot reach {} seats at the final divisors", r[i]);
                error!(target: "tally_algo::biproportional", "{msg}");
                return Err(EngineError::invariant(msg));
            }
        }
    }
    let mut col_need: Vec<i128> = (0..nc)
        .map(|j| c[j] as i128 - (0..nr).map(|i| base[i][j] as i128).sum::<i128>())
        .collect();

    let mut out = Vec::new();
    let mut current = base;
    complete_rows(0, &tied, &row_need, &mut col_need, &mut current, &mut out, max_options)?;

    if out.is_empty() {
        let msg = "sub apportionment found no matrix reproducing the sums".to_string();
        error!(target: "tally_algo::biproportional", "{msg}");
        return Err(EngineError::invariant(msg));
    }
    Ok(out)
}

fn complete_rows(
    i: usize,
    tied: &[Vec<usize>],
    row_need: &[usize],
    col_need: &mut [i128],
    current: &mut [Vec<u64>],
    out: &mut Vec<Vec<Vec<u64>>>,
    max_options: usize,
) -> EngineResult<()> {
    if i == tied.len() {
        if col_need.iter().all(|&x| x == 0) {
            if out.len() >= max_options {
                let msg = format!("sub apportionment exceeds {max_options} lot decision options");
                error!(target: "tally_algo::biproportional", "{msg}");
                return Err(EngineError::invariant(msg));
            }
            out.push(current.to_vec());
        }
        return Ok(());
    }

    let t = tied[i].len();
    let pattern: Vec<u8> = std::iter::repeat(0)
        .take(t - row_need[i])
        .chain(std::iter::repeat(1).take(row_need[i]))
        .collect();

    for pick in UniquePermutations::new(pattern) {
        let cols: Vec<usize> = (0..t).filter(|&p| pick[p] == 1).map(|p| tied[i][p]).collect();
        if cols.iter().any(|&j| col_need[j] <= 0) {
            continue;
        }
        for &j in &cols {
            col_need[j] -= 1;
            current[i][j] += 1;
        }
        complete_rows(i + 1, tied, row_need, col_need, current, out, max_options)?;
        for &j in &cols {
            col_need[j] += 1;
            current[i][j] -= 1;
        }
    }
    Ok(())
}
