//! Observable state of the current attempt.

use assess_state::AssessmentResult;
use serde::Serialize;
use uuid::Uuid;

use super::VideoRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Preparing,
    Recording,
    Scoring,
    Complete,
    Failed,
}

impl Phase {
    /// An attempt is in flight and owns the session.
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Preparing | Phase::Recording | Phase::Scoring)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Preparing => "preparing",
            Phase::Recording => "recording",
            Phase::Scoring => "scoring",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The capture device failed; there is no video.
    Hardware,
    /// Scoring finished but the result could not be stored.
    Persistence,
}

/// Snapshot of one attempt. Written only by the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttemptState {
    pub attempt_id: Option<Uuid>,
    pub test_id: Option<String>,
    pub phase: Phase,
    pub countdown_remaining: u32,
    pub recording_remaining: u32,
    pub upload_fraction: f64,
    /// Most recent error text, including scoring errors that were
    /// absorbed by the local fallback.
    pub last_error: Option<String>,
    pub last_video_ref: Option<VideoRef>,
    pub failure: Option<FailureKind>,
    pub used_fallback: bool,
    pub result: Option<AssessmentResult>,
}

impl AttemptState {
    pub(crate) fn preparing(attempt_id: Uuid, test_id: &str, countdown: u32) -> Self {
        AttemptState {
            attempt_id: Some(attempt_id),
            test_id: Some(test_id.to_string()),
            phase: Phase::Preparing,
            countdown_remaining: countdown,
            ..Default::default()
        }
    }

    pub(crate) fn is_attempt(&self, attempt_id: Uuid) -> bool {
        self.attempt_id == Some(attempt_id)
    }
}
