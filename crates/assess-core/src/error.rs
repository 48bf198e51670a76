//! Crate-level error taxonomy.
//!
//! Each layer has its own enum; `AssessError` wraps them for callers that
//! drive several layers at once.

use assess_state::StorageError;

use crate::benchmark::BenchmarkError;
use crate::capture::{CaptureError, SessionError};
use crate::scoring::ScoreError;

#[derive(Debug, thiserror::Error)]
pub enum AssessError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("scoring error: {0}")]
    Score(#[from] ScoreError),

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("benchmark error: {0}")]
    Benchmark(#[from] BenchmarkError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for assess-core operations.
pub type Result<T> = std::result::Result<T, AssessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Phase;

    #[test]
    fn test_conversions_keep_message() {
        let err: AssessError = SessionError::NotRecording {
            phase: Phase::Idle,
        }
        .into();
        assert!(err.to_string().contains("only valid while recording"));

        let err: AssessError = BenchmarkError::AgeOutOfRange { age: 60 }.into();
        assert!(err.to_string().contains("60"));
    }

    #[test]
    fn test_storage_error_wraps() {
        let err: AssessError = StorageError::InvalidKey {
            key: "a/b".to_string(),
        }
        .into();
        assert!(matches!(err, AssessError::Storage(_)));
    }
}
