//! Structured observability hooks for the attempt lifecycle.
//!
//! This module provides:
//! - Attempt-scoped tracing spans via the `AttemptSpan` RAII guard, or
//!   `attempt_span` for instrumenting async tasks
//! - Emission functions for lifecycle events: start, phase change, upload
//!   progress, scoring fallback, commit and failure
//!
//! Filter with `RUST_LOG`; pass `--json` to the CLI for JSON lines.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capture::{FailureKind, Phase};

/// Span tagged with the attempt and test ids.
pub fn attempt_span(attempt_id: Uuid, test_id: &str) -> tracing::Span {
    tracing::info_span!("assess.attempt", attempt_id = %attempt_id, test_id = %test_id)
}

/// RAII guard that enters an attempt-scoped span.
///
/// The guard is not `Send`; inside async tasks use
/// `attempt_span(..).instrument(..)` instead.
///
/// ```ignore
/// let _span = AttemptSpan::enter(attempt_id, "sit_ups");
/// // tracing calls here carry attempt_id and test_id
/// ```
pub struct AttemptSpan {
    _span: tracing::span::EnteredSpan,
}

impl AttemptSpan {
    pub fn enter(attempt_id: Uuid, test_id: &str) -> Self {
        Self {
            _span: attempt_span(attempt_id, test_id).entered(),
        }
    }
}

pub fn emit_attempt_started(attempt_id: Uuid, test_id: &str) {
    info!(event = "attempt.started", attempt_id = %attempt_id, test_id = %test_id);
}

pub fn emit_phase_changed(attempt_id: Uuid, from: Phase, to: Phase) {
    info!(
        event = "attempt.phase_changed",
        attempt_id = %attempt_id,
        from = %from,
        to = %to,
    );
}

/// Debug level: fires once per upload chunk.
pub fn emit_upload_progress(attempt_id: Uuid, fraction: f64) {
    debug!(event = "attempt.upload_progress", attempt_id = %attempt_id, fraction = fraction);
}

/// Remote scoring failed and the local estimator takes over (warning level).
pub fn emit_scoring_fallback(attempt_id: Uuid, test_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "attempt.scoring_fallback",
        attempt_id = %attempt_id,
        test_id = %test_id,
        error = %error,
    );
}

pub fn emit_attempt_committed(attempt_id: Uuid, test_id: &str, source: &str, score: &str) {
    info!(
        event = "attempt.committed",
        attempt_id = %attempt_id,
        test_id = %test_id,
        source = %source,
        score = %score,
    );
}

/// Attempt moved to `Failed` (warning level).
pub fn emit_attempt_failed(attempt_id: Uuid, kind: FailureKind, error: &dyn std::fmt::Display) {
    warn!(
        event = "attempt.failed",
        attempt_id = %attempt_id,
        failure = ?kind,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_span_create() {
        let _span = AttemptSpan::enter(Uuid::new_v4(), "push_ups");
    }
}
