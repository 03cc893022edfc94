//! tally_core: Core types shared by the end-result engine.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`tally_algo`, `tally_io`, `tally_pipeline`, `tally_cli`).
//!
//! - Registry tokens: `PoliticalBusinessId`, `ListId`, `CandidateId`, …
//! - Shared error surface: `EngineError` (validation / not found / invariant)
//! - Exact rational numerics: `Ratio`
//! - Engine parameters and algorithm domains (`variables`)
//! - Political-business configuration and counting-circle snapshots (`entities`)
//! - Collaborator/operator events (`events`)
//! - Deterministic ordering helpers

#![forbid(unsafe_code)]

pub mod determinism;
pub mod entities;
pub mod errors;
pub mod events;
pub mod ids;
pub mod rounding;
pub mod variables;

pub use errors::{CoreError, EngineError, EngineResult};
pub use rounding::Ratio;
