//! Remote performance scoring.
//!
//! [`Scorer`] is the seam between the capture session and the analysis
//! service. Every [`ScoreError`] is recoverable from the session's point of
//! view: it routes the attempt to the local estimator instead.

pub mod http;
pub mod progress;

use assess_state::AssessmentResult;
use async_trait::async_trait;

use crate::capture::VideoRef;
use crate::catalog::TestDefinition;

pub use http::HttpScorer;
pub use progress::ProgressReporter;

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// No endpoint configured. Retrying cannot help.
    #[error("scoring service is not configured")]
    Configuration,

    /// The service answered with a non-success status.
    #[error("scoring service returned HTTP {status}")]
    Remote {
        status: u16,
        /// Parsed JSON error body, when the service sent one.
        details: Option<serde_json::Value>,
    },

    #[error("scoring request failed: {0}")]
    Transport(String),

    #[error("invalid scoring response: {0}")]
    InvalidResponse(String),

    #[error("cannot read video {path}: {source}")]
    Video {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScoreError {
    /// Whether the same request could succeed later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ScoreError::Configuration)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ScoreError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Submits a recorded video for analysis.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Upload `video` and return the scored result. Upload fractions go to
    /// `progress`; `1.0` is delivered no later than a successful return.
    async fn submit(
        &self,
        test: &TestDefinition,
        video: &VideoRef,
        progress: &ProgressReporter,
    ) -> Result<AssessmentResult, ScoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_permanent() {
        assert!(!ScoreError::Configuration.is_retryable());
        assert!(ScoreError::Transport("connection refused".into()).is_retryable());
        let remote = ScoreError::Remote {
            status: 503,
            details: None,
        };
        assert!(remote.is_retryable());
        assert_eq!(remote.status(), Some(503));
        assert!(remote.to_string().contains("503"));
    }
}
