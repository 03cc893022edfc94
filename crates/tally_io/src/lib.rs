//! crates/tally_io/src/lib.rs
//! Local-file I/O for the end-result engine.
//!
//! - Scenario loading (`loader`): parameters, political business
//!   configuration and the ordered event stream, all from one JSON file.
//! - Canonical JSON (`canonical_json`): sorted keys, compact, atomic writes.
//! - Digests (`hasher`): lowercase SHA-256 hex over canonical bytes.
//!
//! No network I/O.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for tally_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, read, create_dir_all, rename, fsync).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON (de)serialization errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Scenario content that parses but does not hang together.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json keeps line/column, not a pointer.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod loader;

pub use loader::{load_scenario, Scenario};
