//! Assess Core Library
//!
//! Capture-and-scoring pipeline for recorded fitness tests, plus the
//! benchmark rating engine.
//!
//! ## Layer 1 - Domain
//!
//! - `catalog`: the fixed set of supported tests
//! - `benchmark` / `rating`: normative thresholds and tier classification
//! - `scoring`: remote analysis client with upload progress
//! - `estimator`: local fallback when remote scoring fails
//! - `capture`: the single-attempt session state machine
//!
//! Persistence lives in `assess-state`.

pub mod benchmark;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod error;
pub mod estimator;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod rating;
pub mod scoring;
pub mod telemetry;

pub use benchmark::{AgeBand, AgePolicy, BenchmarkError, BenchmarkRow, BenchmarkTable, Gender};
pub use capture::{
    AttemptState, CaptureDevice, CaptureError, CaptureSession, ChannelHandoff, FailureKind,
    FileCaptureDevice, Handoff, Phase, ResultHandoff, SessionError, SessionParts, VideoRef,
};
pub use catalog::{TestDefinition, CATALOG};
pub use config::{ScoringConfig, SessionConfig, StoreConfig};
pub use error::{AssessError, Result};
pub use estimator::{Estimator, LocalEstimator};
pub use rating::{Rating, RatingEngine, Tier};
pub use scoring::{HttpScorer, ProgressReporter, ScoreError, Scorer};

pub use metrics::{Metrics, MetricsSnapshot, METRICS};
pub use obs::{
    emit_attempt_committed, emit_attempt_failed, emit_attempt_started, emit_phase_changed,
    emit_scoring_fallback, emit_upload_progress, AttemptSpan,
};
pub use telemetry::init_tracing;

pub use assess_state::{AssessmentResult, AthleteProfile, ResultSource, ResultStore, Score};
