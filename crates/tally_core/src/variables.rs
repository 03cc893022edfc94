//! Algorithm domains and engine parameters.
//!
//! Notes:
//! - `EngineParams` is loaded from the scenario/parameter JSON; every field
//!   has a default so an empty object is a valid parameter set.
//! - Algorithm enums are part of each political business's configuration,
//!   not of `EngineParams`.

use serde::{Deserialize, Serialize};

/// Mandate algorithm of a proportional election.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProportionalElectionMandateAlgorithm {
    /// Recursive divisor distribution over list unions and sub-list unions.
    HagenbachBischoff,
    /// Biproportional apportionment within a single election (one subdivision).
    DoubleProportionalSingle,
    /// Biproportional apportionment across the elections of a union; the union triggers it.
    DoubleProportionalUnion,
}

impl ProportionalElectionMandateAlgorithm {
    /// Algorithms whose distribution runs as soon as all counting circles are done.
    #[inline]
    pub fn triggers_automatically(self) -> bool {
        !matches!(self, ProportionalElectionMandateAlgorithm::DoubleProportionalUnion)
    }
}

/// Mandate algorithm of a majority election.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorityElectionMandateAlgorithm {
    /// Elected candidates must also reach `floor(candidate votes / mandates / 2) + 1`.
    AbsoluteMajority,
    RelativeMajority,
}

/// Quorum a list group must reach to take part in a biproportional apportionment.
/// Either condition suffices; `None` disables it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DoubleProportionalQuorum {
    /// Minimum share (percent) in at least one subdivision.
    #[serde(default)]
    pub any_subdivision_pct: Option<u8>,
    /// Minimum share (percent) of the total voter numbers.
    #[serde(default)]
    pub total_pct: Option<u8>,
}

impl DoubleProportionalQuorum {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.any_subdivision_pct.is_some() || self.total_pct.is_some()
    }
}

/// Engine-wide knobs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineParams {
    /// Run the mandate distribution when the last counting circle is done
    /// (Hagenbach-Bischoff and single double-proportional elections only).
    pub automatic_mandate_distribution: bool,
    /// Upper bound on enumerated lot decision options of one tie.
    pub max_lot_decision_options: usize,
    /// Upper bound on transfer/scaling steps of the sub-apportionment.
    pub max_tie_and_transfer_steps: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            automatic_mandate_distribution: true,
            max_lot_decision_options: 1_000,
            max_tie_and_transfer_steps: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let p: EngineParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, EngineParams::default());
        assert!(p.automatic_mandate_distribution);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<EngineParams>(r#"{"tie_seed":1}"#).is_err());
    }

    #[test]
    fn union_algorithm_is_not_automatic() {
        use ProportionalElectionMandateAlgorithm::*;
        assert!(HagenbachBischoff.triggers_automatically());
        assert!(DoubleProportionalSingle.triggers_automatically());
        assert!(!DoubleProportionalUnion.triggers_automatically());
    }
}
