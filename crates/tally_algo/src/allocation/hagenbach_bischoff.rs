//! Hagenbach-Bischoff distribution over the list-union tree.
//!
//! Contract:
//! - Tree: root → list unions (→ sub-list unions) → lists; lists without a
//!   union hang directly below the root (or below their union).
//! - Per node with `N` seats and vote total `V`: distribution number
//!   `q = floor(V / (N + 1)) + 1`, initial seats `floor(v_i / q)`.
//! - Remaining seats go one per round to the child with the largest
//!   D'Hondt quotient `v_i / (s_i + 1)`; equal quotients fall back to the
//!   larger remainder `v_i mod q`, then to the larger vote count.
//! - A tie surviving both fallbacks with fewer seats than contenders cannot be
//!   decided by the method: the result is `manual_end_result_required`.
//! - Seats are conserved at every node; a mismatch is an invariant violation.
//!
//! The tree is rebuilt from the flat list input on every run.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, error};

use tally_core::ids::{ListId, ListUnionId};
use tally_core::{EngineError, EngineResult, Ratio};

use super::divisor::DivisorMethod;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum GroupId {
    Root,
    ListUnion(ListUnionId),
    SubListUnion(ListUnionId),
    List(ListId),
}

/// Flat input row: one list with its union memberships.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HbList {
    pub id: ListId,
    pub list_union: Option<ListUnionId>,
    pub sub_list_union: Option<ListUnionId>,
    pub vote_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationRoundWinnerReason {
    Quotient,
    Remainder,
    VoteCount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundQuotient {
    pub group: GroupId,
    pub quotient: Ratio,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CalculationRound {
    pub index: u32,
    pub winner: GroupId,
    pub reason: CalculationRoundWinnerReason,
    pub quotients: Vec<RoundQuotient>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HagenbachBischoffGroup {
    pub id: GroupId,
    pub vote_count: u64,
    pub number_of_mandates: u64,
    /// Distribution number of this node; `None` for leaves and unsolved nodes.
    pub distribution_number: Option<u64>,
    pub initial_number_of_mandates: BTreeMap<String, u64>,
    pub calculation_rounds: Vec<CalculationRound>,
    pub children: Vec<HagenbachBischoffGroup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HagenbachBischoffResult {
    pub root: HagenbachBischoffGroup,
    /// Seats per list; only complete when `!manual_end_result_required`.
    pub list_seats: BTreeMap<ListId, u64>,
    pub manual_end_result_required: bool,
}

impl HagenbachBischoffGroup {
    fn leaf(id: GroupId, vote_count: u64) -> Self {
        Self {
            id,
            vote_count,
            number_of_mandates: 0,
            distribution_number: None,
            initial_number_of_mandates: BTreeMap::new(),
            calculation_rounds: Vec::new(),
            children: Vec::new(),
        }
    }

    fn with_children(id: GroupId, mut children: Vec<HagenbachBischoffGroup>) -> Self {
        children.sort_by(|a, b| a.id.cmp(&b.id));
        let vote_count = children.iter().map(|c| c.vote_count).sum();
        Self { children, ..Self::leaf(id, vote_count) }
    }

    fn collect_list_seats(&self, out: &mut BTreeMap<ListId, u64>) {
        if let GroupId::List(id) = &self.id {
            out.insert(id.clone(), self.number_of_mandates);
        }
        for c in &self.children {
            c.collect_list_seats(out);
        }
    }
}

fn group_key(id: &GroupId) -> String {
    match id {
        GroupId::Root => "root".to_string(),
        GroupId::ListUnion(u) => format!("list_union:{u}"),
        GroupId::SubListUnion(u) => format!("sub_list_union:{u}"),
        GroupId::List(l) => format!("list:{l}"),
    }
}

fn build_tree(lists: &[HbList]) -> HagenbachBischoffGroup {
    // union → (sub union → lists, direct lists)
    type Union = (BTreeMap<ListUnionId, Vec<HagenbachBischoffGroup>>, Vec<HagenbachBischoffGroup>);
    let mut unions: BTreeMap<ListUnionId, Union> = BTreeMap::new();
    let mut root_children = Vec::new();

    for l in lists {
        let leaf = HagenbachBischoffGroup::leaf(GroupId::List(l.id.clone()), l.vote_count);
        match (&l.list_union, &l.sub_list_union) {
            (None, _) => root_children.push(leaf),
            (Some(u), None) => unions.entry(u.clone()).or_default().1.push(leaf),
            (Some(u), Some(s)) => unions
                .entry(u.clone())
                .or_default()
                .0
                .entry(s.clone())
                .or_default()
                .push(leaf),
        }
    }

    for (u, (subs, mut direct)) in unions {
        for (s, members) in subs {
            direct.push(HagenbachBischoffGroup::with_children(GroupId::SubListUnion(s), members));
        }
        root_children.push(HagenbachBischoffGroup::with_children(GroupId::ListUnion(u), direct));
    }
    HagenbachBischoffGroup::with_children(GroupId::Root, root_children)
}

/// Distribute `number_of_mandates` over `lists`.
pub fn distribute(lists: &[HbList], number_of_mandates: u64) -> EngineResult<HagenbachBischoffResult> {
    let mut root = build_tree(lists);
    root.number_of_mandates = number_of_mandates;
    let resolved = distribute_node(&mut root)?;

    let mut list_seats = BTreeMap::new();
    root.collect_list_seats(&mut list_seats);

    if resolved {
        let total: u64 = list_seats.values().sum();
        if total != number_of_mandates {
            let msg = format!(
                "hagenbach-bischoff assigned {total} seats, expected {number_of_mandates}"
            );
            error!(target: "tally_algo::hagenbach_bischoff", "{msg}");
            return Err(EngineError::invariant(msg));
        }
    }

    Ok(HagenbachBischoffResult { root, list_seats, manual_end_result_required: !resolved })
}

/// Returns `false` when a tie the method cannot break was hit in this subtree.
fn distribute_node(node: &mut HagenbachBischoffGroup) -> EngineResult<bool> {
    let n = node.number_of_mandates;
    if node.children.is_empty() {
        return Ok(true);
    }
    if n == 0 {
        for c in &mut node.children {
            c.number_of_mandates = 0;
            distribute_node(c)?;
        }
        return Ok(true);
    }
    if node.vote_count == 0 {
        return Ok(false);
    }

    let q = node.vote_count / (n + 1) + 1;
    node.distribution_number = Some(q);
    for c in &mut node.children {
        c.number_of_mandates = c.vote_count / q;
        node.initial_number_of_mandates.insert(group_key(&c.id), c.number_of_mandates);
    }

    let mut assigned: u64 = node.children.iter().map(|c| c.number_of_mandates).sum();
    if assigned > n {
        let msg = format!("distribution number {q} over-assigned {assigned} of {n} seats");
        error!(target: "tally_algo::hagenbach_bischoff", "{msg}");
        return Err(EngineError::invariant(msg));
    }

    let mut index = 0u32;
    while assigned < n {
        index += 1;
        let quotients: Vec<RoundQuotient> = node
            .children
            .iter()
            .map(|c| RoundQuotient {
                group: c.id.clone(),
                quotient: &Ratio::from_integer(c.vote_count)
                    / &DivisorMethod::DHondt.step(c.number_of_mandates),
            })
            .collect();
        let Some(best) = quotients.iter().map(|r| &r.quotient).max().cloned() else {
            return Ok(false);
        };

        let mut contenders: Vec<usize> =
            (0..node.children.len()).filter(|&i| quotients[i].quotient == best).collect();
        let mut reason = CalculationRoundWinnerReason::Quotient;

        if contenders.len() > 1 {
            let remainder = |i: usize| node.children[i].vote_count % q;
            let top = contenders.iter().map(|&i| remainder(i)).max().unwrap_or(0);
            contenders.retain(|&i| remainder(i) == top);
            reason = CalculationRoundWinnerReason::Remainder;
        }
        if contenders.len() > 1 {
            let top = contenders.iter().map(|&i| node.children[i].vote_count).max().unwrap_or(0);
            contenders.retain(|&i| node.children[i].vote_count == top);
            reason = CalculationRoundWinnerReason::VoteCount;
        }
        if contenders.len() > 1 {
            // Every contender stays on top until served, so the order only
            // matters when they do not all fit.
            if contenders.len() as u64 > n - assigned {
                debug!(
                    target: "tally_algo::hagenbach_bischoff",
                    node = %group_key(&node.id),
                    contenders = contenders.len(),
                    open = n - assigned,
                    "unbreakable tie"
                );
                return Ok(false);
            }
            reason = CalculationRoundWinnerReason::Quotient;
        }

        let winner = contenders[0];
        node.children[winner].number_of_mandates += 1;
        assigned += 1;
        node.calculation_rounds.push(CalculationRound {
            index,
            winner: node.children[winner].id.clone(),
            reason,
            quotients,
        });
    }

    let mut resolved = true;
    for c in &mut node.children {
        resolved &= distribute_node(c)?;
    }
    Ok(resolved)
}
