//! Global atomic counters for attempt outcomes.
//!
//! Counters are incremented silently by session transitions. Call
//! [`Metrics::flush`] to log an attempt summary (the CLI does this before
//! exiting).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    attempts_started: AtomicU64,
    remote_scores: AtomicU64,
    local_fallbacks: AtomicU64,
    commits: AtomicU64,
    failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            attempts_started: AtomicU64::new(0),
            remote_scores: AtomicU64::new(0),
            local_fallbacks: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn inc_attempts_started(&self) {
        self.attempts_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "attempts_started", "counter incremented");
    }

    pub fn inc_remote_scores(&self) {
        self.remote_scores.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "remote_scores", "counter incremented");
    }

    pub fn inc_local_fallbacks(&self) {
        self.local_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "local_fallbacks", "counter incremented");
    }

    pub fn inc_commits(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "commits", "counter incremented");
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "failures", "counter incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts_started: self.attempts_started(),
            remote_scores: self.remote_scores(),
            local_fallbacks: self.local_fallbacks(),
            commits: self.commits(),
            failures: self.failures(),
        }
    }

    /// Log one `attempts.summary` event. Nothing is logged before the
    /// first attempt.
    pub fn flush(&self) {
        let snap = self.snapshot();
        if snap.attempts_started == 0 {
            return;
        }
        tracing::info!(
            event = "attempts.summary",
            started = snap.attempts_started,
            committed = snap.commits,
            failed = snap.failures,
            remote = snap.remote_scores,
            local = snap.local_fallbacks,
            fallback_share = snap.fallback_share().unwrap_or(0.0),
            "attempt summary"
        );
    }

    pub fn attempts_started(&self) -> u64 {
        self.attempts_started.load(Ordering::Relaxed)
    }

    pub fn remote_scores(&self) -> u64 {
        self.remote_scores.load(Ordering::Relaxed)
    }

    pub fn local_fallbacks(&self) -> u64 {
        self.local_fallbacks.load(Ordering::Relaxed)
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.attempts_started,
            &self.remote_scores,
            &self.local_fallbacks,
            &self.commits,
            &self.failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub attempts_started: u64,
    pub remote_scores: u64,
    pub local_fallbacks: u64,
    pub commits: u64,
    pub failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of scored attempts that fell back to the local estimator.
    pub fn fallback_share(&self) -> Option<f64> {
        let scored = self.remote_scores + self.local_fallbacks;
        (scored > 0).then(|| self.local_fallbacks as f64 / scored as f64)
    }
}
