// crates/tally_algo/src/lib.rs
//! Pure, deterministic algorithms of the end-result engine. No I/O, no RNG:
//! every tie that would need chance is surfaced as a lot decision instead.

#![forbid(unsafe_code)]

// ----------------------------- Ranking & ties --------------------------------------

pub mod combinatorics;
pub mod lot_decision;
pub mod rank;

pub use lot_decision::{validate_lot_decisions, LotDecisionInput};
pub use rank::{compute_ranks, tie_groups, RankInput, RankedEntry, TieGroup};

// ----------------------------- Allocation (public surface) ---------------------------

pub mod allocation {
    pub mod biproportional;
    pub mod divisor;
    pub mod hagenbach_bischoff;

    pub use biproportional::{
        BiproportionalInput, DoubleProportionalResult, SubApportionmentLotDecision,
        SubdivisionSeats, SuperApportionmentLotDecision,
    };
    pub use divisor::{apportion as divisor_apportion, DivisorApportionment, DivisorMethod, DivisorTie};
    pub use hagenbach_bischoff::{
        distribute as hagenbach_bischoff_distribute, GroupId, HagenbachBischoffGroup,
        HagenbachBischoffResult, HbList,
    };
}
