//! End-result progress: done counting circles and lifecycle flags.
//!
//! Phases: `Pending → AllCountingCirclesDone → MandatesDistributed → Finalized`,
//! with a revert edge out of each of the last two. The guards below are the
//! only way callers move between phases; every guard fails with a
//! `Validation` error before anything is mutated.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::error;

use tally_core::entities::DeltaFactor;
use tally_core::{EngineError, EngineResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndResultPhase {
    Pending,
    AllCountingCirclesDone,
    MandatesDistributed,
    Finalized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndResultProgress {
    pub count_of_done_counting_circles: u32,
    pub total_count_of_counting_circles: u32,
    pub mandate_distribution_triggered: bool,
    pub manual_end_result_required: bool,
    pub finalized: bool,
}

impl EndResultProgress {
    pub fn new(total_count_of_counting_circles: u32) -> Self {
        EndResultProgress {
            count_of_done_counting_circles: 0,
            total_count_of_counting_circles,
            mandate_distribution_triggered: false,
            manual_end_result_required: false,
            finalized: false,
        }
    }

    #[inline]
    pub fn all_counting_circles_done(&self) -> bool {
        self.count_of_done_counting_circles == self.total_count_of_counting_circles
    }

    pub fn phase(&self) -> EndResultPhase {
        if self.finalized {
            EndResultPhase::Finalized
        } else if self.mandate_distribution_triggered {
            EndResultPhase::MandatesDistributed
        } else if self.all_counting_circles_done() {
            EndResultPhase::AllCountingCirclesDone
        } else {
            EndResultPhase::Pending
        }
    }

    /// Move the done count by one when a circle crossed the done threshold.
    /// Returns `(was_all_done, is_all_done)`.
    pub fn apply_done_delta(
        &mut self,
        factor: DeltaFactor,
        done_state_changed: bool,
    ) -> EngineResult<(bool, bool)> {
        let was = self.all_counting_circles_done();
        if !done_state_changed {
            return Ok((was, was));
        }
        let next = match factor {
            DeltaFactor::Add => self
                .count_of_done_counting_circles
                .checked_add(1)
                .filter(|&c| c <= self.total_count_of_counting_circles),
            DeltaFactor::Remove => self.count_of_done_counting_circles.checked_sub(1),
        };
        let Some(next) = next else {
            let msg = format!(
                "done counting circles would leave [0, {}] (currently {}, factor {})",
                self.total_count_of_counting_circles,
                self.count_of_done_counting_circles,
                factor.sign()
            );
            error!(target: "tally::invariant", "{msg}");
            return Err(EngineError::invariant(msg));
        };
        self.count_of_done_counting_circles = next;
        Ok((was, self.all_counting_circles_done()))
    }

    pub fn ensure_not_finalized(&self) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::validation("end result is finalized"));
        }
        Ok(())
    }

    pub fn ensure_all_counting_circles_done(&self) -> EngineResult<()> {
        if !self.all_counting_circles_done() {
            return Err(EngineError::validation(format!(
                "only {} of {} counting circles are done",
                self.count_of_done_counting_circles, self.total_count_of_counting_circles
            )));
        }
        Ok(())
    }

    pub fn ensure_can_trigger_distribution(&self) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        self.ensure_all_counting_circles_done()?;
        if self.mandate_distribution_triggered {
            return Err(EngineError::validation("mandate distribution already triggered"));
        }
        Ok(())
    }

    pub fn ensure_can_revert_distribution(&self) -> EngineResult<()> {
        self.ensure_not_finalized()?;
        if !self.mandate_distribution_triggered {
            return Err(EngineError::validation("mandate distribution has not been triggered"));
        }
        Ok(())
    }

    pub fn ensure_can_finalize(&self, requires_distribution: bool) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::validation("end result is already finalized"));
        }
        self.ensure_all_counting_circles_done()?;
        if requires_distribution && !self.mandate_distribution_triggered {
            return Err(EngineError::validation("mandates have not been distributed"));
        }
        Ok(())
    }

    pub fn ensure_can_revert_finalization(&self) -> EngineResult<()> {
        if !self.finalized {
            return Err(EngineError::validation("end result is not finalized"));
        }
        Ok(())
    }
}

// Snapshot shape carries the derived phase next to the raw counters.
impl Serialize for EndResultProgress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("EndResultProgress", 7)?;
        s.serialize_field("phase", &self.phase())?;
        s.serialize_field("count_of_done_counting_circles", &self.count_of_done_counting_circles)?;
        s.serialize_field("total_count_of_counting_circles", &self.total_count_of_counting_circles)?;
        s.serialize_field("all_counting_circles_done", &self.all_counting_circles_done())?;
        s.serialize_field("mandate_distribution_triggered", &self.mandate_distribution_triggered)?;
        s.serialize_field("manual_end_result_required", &self.manual_end_result_required)?;
        s.serialize_field("finalized", &self.finalized)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_count_stays_within_bounds() {
        let mut p = EndResultProgress::new(2);
        assert_eq!(p.apply_done_delta(DeltaFactor::Add, true).unwrap(), (false, false));
        assert_eq!(p.apply_done_delta(DeltaFactor::Add, false).unwrap(), (false, false));
        assert_eq!(p.apply_done_delta(DeltaFactor::Add, true).unwrap(), (false, true));
        assert!(p.apply_done_delta(DeltaFactor::Add, true).unwrap_err().is_invariant_violation());
        assert_eq!(p.count_of_done_counting_circles, 2);
        assert_eq!(p.apply_done_delta(DeltaFactor::Remove, true).unwrap(), (true, false));

        let mut empty = EndResultProgress::new(1);
        assert!(empty
            .apply_done_delta(DeltaFactor::Remove, true)
            .unwrap_err()
            .is_invariant_violation());
    }

    #[test]
    fn phases_follow_flags() {
        let mut p = EndResultProgress::new(1);
        assert_eq!(p.phase(), EndResultPhase::Pending);
        assert!(p.ensure_can_trigger_distribution().is_err());
        p.apply_done_delta(DeltaFactor::Add, true).unwrap();
        assert_eq!(p.phase(), EndResultPhase::AllCountingCirclesDone);
        assert!(p.ensure_can_finalize(true).is_err());
        p.ensure_can_trigger_distribution().unwrap();
        p.mandate_distribution_triggered = true;
        assert!(p.ensure_can_trigger_distribution().is_err());
        assert_eq!(p.phase(), EndResultPhase::MandatesDistributed);
        p.ensure_can_finalize(true).unwrap();
        p.finalized = true;
        assert_eq!(p.phase(), EndResultPhase::Finalized);
        assert!(p.ensure_can_revert_distribution().is_err());
        p.ensure_can_revert_finalization().unwrap();
    }

    #[test]
    fn snapshot_carries_phase() {
        let p = EndResultProgress::new(0);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["phase"], "all_counting_circles_done");
        assert_eq!(v["all_counting_circles_done"], true);
    }
}
