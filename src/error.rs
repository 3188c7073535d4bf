//! Error taxonomy for scoring and the service boundary.
//!
//! Startup failures are not represented here: they abort the process through
//! `anyhow` in `main` before the service ever reaches the serving state.

use thiserror::Error;

/// A failure while producing relevance scores for one request.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The underlying model or its endpoint failed.
    #[error("model failure: {0}")]
    Model(String),
    /// The scorer broke the one-score-per-document contract.
    #[error("scorer returned {actual} scores for {expected} documents")]
    LengthMismatch { expected: usize, actual: usize },
    /// The scoring task panicked or was aborted.
    #[error("scoring task aborted: {0}")]
    Panicked(String),
}

/// A per-call failure surfaced to the caller of the ranking service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),
    #[error("service is shutting down")]
    Shutdown,
}

impl ServiceError {
    /// Stable code sent in wire error frames.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Scoring(_) => "scoring_failed",
            ServiceError::Shutdown => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: ServiceError = ScoringError::Model("boom".into()).into();
        assert_eq!(err.code(), "scoring_failed");
        assert_eq!(ServiceError::Shutdown.code(), "unavailable");
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = ScoringError::LengthMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "scorer returned 2 scores for 3 documents");
    }
}
