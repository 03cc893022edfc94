//! tally_pipeline: end-result aggregates and the event-driven pipeline
//! (load → replay events → snapshot → digest).
//!
//! The aggregates themselves are I/O-free; `run_scenario_path` is the one
//! entry point that touches the filesystem, through `tally_io`.

#![forbid(unsafe_code)]

use std::path::Path;

use tally_core::EngineError;
use tally_io::{canonical_json, hasher, IoError, Scenario};

mod aggregate;
pub mod candidates;
pub mod lifecycle;
pub mod lot_decisions;
pub mod majority;
pub mod progress;
pub mod proportional;
pub mod set;
pub mod union;
pub mod vote;

pub use candidates::{CandidateEndResult, CandidateEndResultState};
pub use lifecycle::{EndResult, FinalizationContext, PoliticalBusinessEndResult};
pub use lot_decisions::{AvailableLotDecisions, AvailableTieGroup};
pub use majority::MajorityElectionEndResult;
pub use progress::{EndResultPhase, EndResultProgress};
pub use proportional::{ListEndResult, ProportionalElectionEndResult};
pub use set::{EndResultSet, EndResultSetSnapshot};
pub use union::ProportionalElectionUnionEndResult;
pub use vote::{BallotEndResult, VoteEndResult};

/// Single error surface for pipeline orchestration.
#[derive(Debug)]
pub enum PipelineError {
    /// Loading or writing artifacts.
    Io(IoError),
    /// The configuration itself was rejected.
    Config(EngineError),
    /// Event `index` was rejected; events before it were applied.
    Event { index: usize, name: &'static str, error: EngineError },
}

impl PipelineError {
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            PipelineError::Io(_) => None,
            PipelineError::Config(e) | PipelineError::Event { error: e, .. } => Some(e),
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "{e}"),
            PipelineError::Config(e) => write!(f, "configuration: {e}"),
            PipelineError::Event { index, name, error } => write!(f, "event {index} ({name}): {error}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        PipelineError::Io(e)
    }
}

#[derive(Debug)]
pub struct PipelineOutputs {
    pub set: EndResultSet,
    pub applied_events: usize,
    /// Canonical JSON of the end-result snapshot.
    pub snapshot: serde_json::Value,
    /// `SNAP:<hex>` over the canonical snapshot bytes.
    pub snapshot_id: String,
    pub scenario_sha256: String,
}

/// Build the end results and replay every event of `scenario`.
pub fn run_scenario(scenario: &Scenario) -> Result<PipelineOutputs, PipelineError> {
    let mut set = EndResultSet::new(scenario.params.clone(), scenario.political_businesses.clone())
        .map_err(PipelineError::Config)?;
    let applied_events = set.apply_all(&scenario.events).map_err(|(index, error)| {
        PipelineError::Event {
            index,
            name: scenario.events.get(index).map_or("unknown", |e| e.name()),
            error,
        }
    })?;

    let snapshot = serde_json::to_value(set.snapshot()).map_err(IoError::from)?;
    let snapshot_id = hasher::snapshot_id(&snapshot)?;
    let scenario_sha256 = scenario.digest()?;
    tracing::info!(events = applied_events, snapshot = %snapshot_id, "scenario replayed");
    Ok(PipelineOutputs { set, applied_events, snapshot, snapshot_id, scenario_sha256 })
}

/// Load `path`, replay it and optionally write the canonical snapshot to `out`.
pub fn run_scenario_path(path: &Path, out: Option<&Path>) -> Result<PipelineOutputs, PipelineError> {
    let scenario = tally_io::load_scenario(path)?;
    let outputs = run_scenario(&scenario)?;
    if let Some(out) = out {
        canonical_json::write_canonical_file(out, &outputs.snapshot)?;
    }
    Ok(outputs)
}
