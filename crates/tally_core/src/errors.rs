//! Error sets for core-domain parsing and for engine operations.

use thiserror::Error;

/// Token / ratio parsing failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid ratio")]
    InvalidRatio,
}

/// Error taxonomy of every engine operation.
///
/// - `Validation`: caller input rejected before any mutation.
/// - `NotFound`: referenced entity does not exist in the current state.
/// - `InvariantViolation`: a defect; the operation is aborted without commit.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound { kind, id: id.to_string() }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        EngineError::InvariantViolation(msg.into())
    }

    #[inline]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::InvariantViolation(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            EngineError::not_found("list", "L-1").to_string(),
            "list not found: L-1"
        );
        assert_eq!(
            EngineError::validation("rank 3 taken twice").to_string(),
            "validation failed: rank 3 taken twice"
        );
        assert!(EngineError::invariant("seat sum").is_invariant_violation());
    }
}
