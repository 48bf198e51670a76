//! Capture session: countdown, recording, scoring and commit of one attempt
//! at a time.
//!
//! The session is the single writer of [`AttemptState`]. Readers subscribe
//! to a `watch` channel and only ever see snapshots. Each attempt runs as
//! one spawned task; control operations (`start`, `stop`, `retry`, ...) are
//! synchronous and decide under the watch channel's lock, so two callers can
//! never both win a `start`.

pub mod device;
pub mod handoff;
pub mod state;

use std::sync::{Arc, Mutex, PoisonError};

use assess_state::{AssessmentResult, ResultStore};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::TestDefinition;
use crate::config::SessionConfig;
use crate::estimator::Estimator;
use crate::metrics::METRICS;
use crate::obs::{self, AttemptSpan};
use crate::scoring::{ProgressReporter, ScoreError, Scorer};

pub use device::{CaptureDevice, CaptureError, FileCaptureDevice, VideoRef};
pub use handoff::{ChannelHandoff, Handoff, ResultHandoff};
pub use state::{AttemptState, FailureKind, Phase};

/// Rejections of session control operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("an attempt is already in progress ({phase})")]
    AlreadyInProgress { phase: Phase },

    #[error("stop is only valid while recording (currently {phase})")]
    NotRecording { phase: Phase },

    #[error("no recorded video to retry")]
    NothingToRetry,

    #[error("unknown test: {0}")]
    UnknownTest(String),

    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },
}

/// Collaborators injected into a session.
pub struct SessionParts {
    pub device: Arc<dyn CaptureDevice>,
    pub scorer: Arc<dyn Scorer>,
    pub estimator: Arc<dyn Estimator>,
    pub store: ResultStore,
    pub handoff: Arc<dyn ResultHandoff>,
}

#[derive(Default)]
struct Control {
    stop: Option<Arc<Notify>>,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    config: SessionConfig,
    parts: SessionParts,
    state: watch::Sender<AttemptState>,
    control: Mutex<Control>,
}

/// Handle to a capture session. Clones share the same session.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Inner>,
}

impl CaptureSession {
    pub fn new(config: SessionConfig, parts: SessionParts) -> Self {
        let (state, _) = watch::channel(AttemptState::default());
        Self {
            inner: Arc::new(Inner {
                config,
                parts,
                state,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> AttemptState {
        self.inner.state.borrow().clone()
    }

    /// Begin a new attempt for `test_id`. Allowed from `Idle` and
    /// `Complete`; a `Failed` attempt must be acknowledged or retried first.
    pub fn start(&self, test_id: &str) -> Result<Uuid, SessionError> {
        let test = TestDefinition::lookup(test_id)
            .ok_or_else(|| SessionError::UnknownTest(test_id.to_string()))?;
        let attempt_id = Uuid::new_v4();
        let countdown = self.inner.config.countdown_ticks;

        let mut control = self.inner.lock_control();
        let mut rejected = None;
        self.inner.state.send_if_modified(|state| {
            if state.phase.is_active() {
                rejected = Some(SessionError::AlreadyInProgress { phase: state.phase });
                return false;
            }
            if state.phase == Phase::Failed {
                rejected = Some(SessionError::InvalidTransition {
                    operation: "start",
                    phase: Phase::Failed,
                });
                return false;
            }
            *state = AttemptState::preparing(attempt_id, test.id, countdown);
            true
        });
        if let Some(err) = rejected {
            return Err(err);
        }

        {
            let _span = AttemptSpan::enter(attempt_id, test.id);
            obs::emit_attempt_started(attempt_id, test.id);
            obs::emit_phase_changed(attempt_id, Phase::Idle, Phase::Preparing);
        }
        METRICS.inc_attempts_started();

        let stop = Arc::new(Notify::new());
        let task = tokio::spawn(
            run_attempt(self.inner.clone(), attempt_id, test, stop.clone())
                .instrument(obs::attempt_span(attempt_id, test.id)),
        );
        control.stop = Some(stop);
        control.task = Some(task);
        Ok(attempt_id)
    }

    /// End recording early. The video recorded so far is scored.
    pub fn stop(&self) -> Result<(), SessionError> {
        let phase = self.inner.state.borrow().phase;
        if phase != Phase::Recording {
            return Err(SessionError::NotRecording { phase });
        }
        if let Some(stop) = &self.inner.lock_control().stop {
            stop.notify_one();
        }
        Ok(())
    }

    /// Return a completed session to `Idle`.
    pub fn reset(&self) -> Result<(), SessionError> {
        self.return_to_idle("reset", |phase| {
            matches!(phase, Phase::Idle | Phase::Complete)
        })
    }

    /// Dismiss a failed attempt.
    pub fn acknowledge(&self) -> Result<(), SessionError> {
        self.return_to_idle("acknowledge", |phase| phase == Phase::Failed)
    }

    /// Abandon whatever is in progress. Scoring cannot be cancelled.
    pub fn discard(&self) -> Result<(), SessionError> {
        // held across the reset so a racing start cannot install its task
        // before the abort below
        let mut control = self.inner.lock_control();
        self.return_to_idle("discard", |phase| phase != Phase::Scoring)?;
        control.stop = None;
        if let Some(task) = control.task.take() {
            task.abort();
        }
        Ok(())
    }

    /// Re-score the last recorded video of a failed attempt.
    pub fn retry(&self) -> Result<(), SessionError> {
        let mut control = self.inner.lock_control();
        let mut outcome = Err(SessionError::NothingToRetry);
        self.inner.state.send_if_modified(|state| {
            if state.phase != Phase::Failed {
                outcome = Err(SessionError::InvalidTransition {
                    operation: "retry",
                    phase: state.phase,
                });
                return false;
            }
            let test = state.test_id.as_deref().and_then(TestDefinition::lookup);
            match (state.attempt_id, test, state.last_video_ref.clone()) {
                (Some(attempt_id), Some(test), Some(video)) => {
                    state.phase = Phase::Scoring;
                    state.failure = None;
                    state.upload_fraction = 0.0;
                    state.used_fallback = false;
                    state.result = None;
                    outcome = Ok((attempt_id, test, video));
                    true
                }
                _ => false,
            }
        });
        let (attempt_id, test, video) = outcome?;

        obs::emit_phase_changed(attempt_id, Phase::Failed, Phase::Scoring);
        let task = tokio::spawn(
            score_attempt(self.inner.clone(), attempt_id, test, video)
                .instrument(obs::attempt_span(attempt_id, test.id)),
        );
        control.stop = None;
        control.task = Some(task);
        Ok(())
    }

    /// Wait until no attempt is in flight and return the final snapshot.
    pub async fn settled(&self) -> AttemptState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|state| !state.phase.is_active()).await;
        match settled {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    fn return_to_idle(
        &self,
        operation: &'static str,
        allowed: impl Fn(Phase) -> bool,
    ) -> Result<(), SessionError> {
        let mut rejected = None;
        self.inner.state.send_if_modified(|state| {
            if !allowed(state.phase) {
                rejected = Some(SessionError::InvalidTransition {
                    operation,
                    phase: state.phase,
                });
                return false;
            }
            if state.phase == Phase::Idle {
                return false;
            }
            *state = AttemptState::default();
            true
        });
        rejected.map_or(Ok(()), Err)
    }
}

impl Inner {
    fn lock_control(&self) -> std::sync::MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` while `attempt_id` still owns an active state. Returns
    /// false once the attempt was discarded or has settled.
    fn update(&self, attempt_id: Uuid, f: impl FnOnce(&mut AttemptState)) -> bool {
        self.state.send_if_modified(|state| {
            if !state.is_attempt(attempt_id) || !state.phase.is_active() {
                return false;
            }
            f(state);
            true
        })
    }

    fn transition(
        &self,
        attempt_id: Uuid,
        to: Phase,
        f: impl FnOnce(&mut AttemptState),
    ) -> bool {
        let mut from = None;
        let applied = self.update(attempt_id, |state| {
            from = Some(state.phase);
            state.phase = to;
            f(state);
        });
        if let Some(from) = from {
            obs::emit_phase_changed(attempt_id, from, to);
        }
        applied
    }

    fn fail(&self, attempt_id: Uuid, kind: FailureKind, err: &dyn std::fmt::Display) {
        let message = err.to_string();
        let failed = self.transition(attempt_id, Phase::Failed, |state| {
            state.failure = Some(kind);
            state.last_error = Some(message);
        });
        if failed {
            obs::emit_attempt_failed(attempt_id, kind, err);
            METRICS.inc_failures();
        }
    }

    /// Progress sink bound to one attempt; deliveries outside its Scoring
    /// phase are dropped.
    fn progress_reporter(self: &Arc<Self>, attempt_id: Uuid) -> ProgressReporter {
        let inner = Arc::clone(self);
        ProgressReporter::new(move |fraction| {
            let applied = inner.state.send_if_modified(|state| {
                if !state.is_attempt(attempt_id) || state.phase != Phase::Scoring {
                    return false;
                }
                state.upload_fraction = fraction;
                true
            });
            if applied {
                obs::emit_upload_progress(attempt_id, fraction);
            }
        })
    }
}

async fn run_attempt(
    inner: Arc<Inner>,
    attempt_id: Uuid,
    test: &'static TestDefinition,
    stop: Arc<Notify>,
) {
    let tick = inner.config.tick;
    let mut remaining = inner.config.countdown_ticks;
    while remaining > 0 {
        tokio::time::sleep(tick).await;
        remaining -= 1;
        if !inner.update(attempt_id, |state| state.countdown_remaining = remaining) {
            return;
        }
    }

    let duration = test.recording_duration_secs;
    let recording = inner.transition(attempt_id, Phase::Recording, |state| {
        state.countdown_remaining = 0;
        state.recording_remaining = duration;
    });
    if !recording {
        return;
    }

    let video = match record(&inner, attempt_id, test, &stop).await {
        Ok(video) => video,
        Err(err) => {
            inner.fail(attempt_id, FailureKind::Hardware, &err);
            return;
        }
    };

    let scoring = inner.transition(attempt_id, Phase::Scoring, |state| {
        state.recording_remaining = 0;
        state.upload_fraction = 0.0;
        state.last_video_ref = Some(video.clone());
    });
    if scoring {
        score_attempt(inner, attempt_id, test, video).await;
    }
}

/// Record until the ceiling expires or `stop` fires.
async fn record(
    inner: &Inner,
    attempt_id: Uuid,
    test: &TestDefinition,
    stop: &Notify,
) -> Result<VideoRef, CaptureError> {
    let tick = inner.config.tick;
    let mut remaining = test.recording_duration_secs;
    inner.parts.device.begin(tick * remaining).await?;

    while remaining > 0 {
        tokio::select! {
            _ = tokio::time::sleep(tick) => {
                remaining -= 1;
                inner.update(attempt_id, |state| state.recording_remaining = remaining);
            }
            _ = stop.notified() => break,
        }
    }
    inner.parts.device.finish().await
}

async fn score_attempt(
    inner: Arc<Inner>,
    attempt_id: Uuid,
    test: &'static TestDefinition,
    video: VideoRef,
) {
    let progress = inner.progress_reporter(attempt_id);
    let result = match inner.parts.scorer.submit(test, &video, &progress).await {
        Ok(result) => {
            METRICS.inc_remote_scores();
            result
        }
        Err(err) => fall_back_to_local(&inner, attempt_id, test, &video, err).await,
    };
    commit(&inner, attempt_id, test, result).await;
}

/// Remote scoring failed; the local estimator produces the result instead.
/// The error is kept as `last_error` and never fails the attempt.
async fn fall_back_to_local(
    inner: &Inner,
    attempt_id: Uuid,
    test: &'static TestDefinition,
    video: &VideoRef,
    err: ScoreError,
) -> AssessmentResult {
    obs::emit_scoring_fallback(attempt_id, test.id, &err);
    METRICS.inc_local_fallbacks();
    let message = err.to_string();
    inner.update(attempt_id, |state| {
        state.last_error = Some(message);
        state.used_fallback = true;
    });
    inner.parts.estimator.estimate(test, video).await
}

/// Append, hand off, then publish `Complete`. Nothing is handed off unless
/// the append succeeded.
async fn commit(
    inner: &Inner,
    attempt_id: Uuid,
    test: &'static TestDefinition,
    result: AssessmentResult,
) {
    if let Err(err) = inner.parts.store.append(&result).await {
        inner.fail(attempt_id, FailureKind::Persistence, &err);
        return;
    }

    obs::emit_attempt_committed(
        attempt_id,
        test.id,
        result.source.as_str(),
        &result.score.to_string(),
    );
    METRICS.inc_commits();

    inner
        .parts
        .handoff
        .hand_off(Handoff {
            result: result.clone(),
            test,
        })
        .await;

    inner.transition(attempt_id, Phase::Complete, |state| {
        state.result = Some(result);
    });
}
