//! Capture session lifecycle tests.
//!
//! Most tests run on a paused clock so countdown, recording and estimator
//! timing are exact and instantaneous. Races between control operations run
//! on a multi-threaded runtime in real time.

use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use assess_core::fakes::{FixedEstimator, RecordingHandoff, ScriptedCapture, ScriptedScorer};
use assess_core::{
    AssessmentResult, CaptureSession, FailureKind, HttpScorer, Phase, ProgressReporter,
    ResultSource, ResultStore, ScoreError, Scorer, ScoringConfig, SessionConfig, SessionError,
    SessionParts, TestDefinition, VideoRef,
};
use assess_state::fakes::MemoryBlobStore;
use async_trait::async_trait;
use tokio::time::Instant;

const VIDEO: &str = "/videos/attempt-1.mp4";

struct Harness {
    session: CaptureSession,
    blobs: Arc<MemoryBlobStore>,
    store: ResultStore,
    capture: Arc<ScriptedCapture>,
    estimator: Arc<FixedEstimator>,
    handoff: Arc<RecordingHandoff>,
}

fn harness_with(scorer: Arc<dyn Scorer>, capture: ScriptedCapture) -> Harness {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = ResultStore::new(blobs.clone());
    let capture = Arc::new(capture);
    let estimator = Arc::new(FixedEstimator::new(33.0));
    let handoff = Arc::new(RecordingHandoff::new());

    let session = CaptureSession::new(
        SessionConfig::default(),
        SessionParts {
            device: capture.clone(),
            scorer,
            estimator: estimator.clone(),
            store: store.clone(),
            handoff: handoff.clone(),
        },
    );
    Harness {
        session,
        blobs,
        store,
        capture,
        estimator,
        handoff,
    }
}

fn harness(scorer: ScriptedScorer) -> Harness {
    harness_with(Arc::new(scorer), ScriptedCapture::new(VIDEO))
}

/// Scorer that keeps every reporter it is handed, then fails after a delay.
#[derive(Default)]
struct LingeringScorer {
    reporters: Mutex<Vec<ProgressReporter>>,
}

impl LingeringScorer {
    fn reporter(&self, index: usize) -> ProgressReporter {
        self.reporters.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Scorer for LingeringScorer {
    async fn submit(
        &self,
        _test: &TestDefinition,
        _video: &VideoRef,
        progress: &ProgressReporter,
    ) -> Result<AssessmentResult, ScoreError> {
        progress.report(0.3);
        self.reporters.lock().unwrap().push(progress.clone());
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(ScoreError::Transport("connection dropped".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn remote_success_commits_once() {
    let h = harness(ScriptedScorer::scoring(47.0));

    let attempt_id = h.session.start("vertical_jump").unwrap();
    let state = h.session.settled().await;

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.attempt_id, Some(attempt_id));
    assert!(!state.used_fallback);
    assert_eq!(state.upload_fraction, 1.0);

    let stored = h.store.read_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].source, ResultSource::Remote);
    assert_eq!(stored[0].numeric_score(), Some(47.0));
    assert_eq!(h.estimator.calls(), 0);

    let handed = h.handoff.received();
    assert_eq!(handed.len(), 1);
    assert_eq!(handed[0].result, stored[0]);
    assert_eq!(handed[0].test.id, "vertical_jump");
    assert_eq!(state.result.as_ref(), Some(&stored[0]));
}

#[tokio::test(start_paused = true)]
async fn remote_failure_falls_back_and_commits_once() {
    let h = harness(ScriptedScorer::failing(ScoreError::Remote {
        status: 500,
        details: None,
    }));

    h.session.start("sit_ups").unwrap();
    let state = h.session.settled().await;

    assert_eq!(state.phase, Phase::Complete);
    assert!(state.used_fallback);
    assert!(state.last_error.as_deref().unwrap().contains("500"));
    assert_eq!(h.estimator.calls(), 1);

    let stored = h.store.read_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_local_estimate());
    assert_eq!(stored[0].video_ref, VIDEO);

    let handed = h.handoff.received();
    assert_eq!(handed.len(), 1);
    assert_eq!(handed[0].result, stored[0]);
}

#[tokio::test(start_paused = true)]
async fn unconfigured_scorer_falls_back_to_local() {
    let scorer = HttpScorer::new(ScoringConfig::default()).unwrap();
    let h = harness_with(Arc::new(scorer), ScriptedCapture::new(VIDEO));

    h.session.start("flexibility").unwrap();
    let state = h.session.settled().await;

    assert_eq!(state.phase, Phase::Complete);
    assert!(state.used_fallback);
    assert!(state.last_error.unwrap().contains("not configured"));
    assert_eq!(h.store.read_all().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_and_recording_run_on_ticks() {
    let h = harness(ScriptedScorer::scoring(30.0));
    let started = Instant::now();

    h.session.start("vertical_jump").unwrap();
    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Recording).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(rx.borrow().recording_remaining, 10);

    h.session.settled().await;
    // 3 countdown ticks plus the 10 s recording ceiling
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(13) && elapsed < Duration::from_secs(14));
    assert_eq!(h.capture.begins(), 1);
    assert_eq!(h.capture.finishes(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_ends_recording_early() {
    let h = harness(ScriptedScorer::scoring(30.0));
    let started = Instant::now();

    h.session.start("sit_ups").unwrap();
    assert!(matches!(
        h.session.stop(),
        Err(SessionError::NotRecording {
            phase: Phase::Preparing
        })
    ));

    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Recording).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.session.stop().unwrap();

    let state = h.session.settled().await;
    assert_eq!(state.phase, Phase::Complete);
    assert!(started.elapsed() < Duration::from_secs(3 + 20));
    assert_eq!(state.last_video_ref, Some(VideoRef::new(VIDEO)));
}

#[tokio::test(start_paused = true)]
async fn start_while_active_is_rejected() {
    let h = harness(ScriptedScorer::scoring(40.0).with_delay(Duration::from_secs(5)));

    let attempt_id = h.session.start("push_ups").unwrap();
    assert_eq!(
        h.session.start("push_ups"),
        Err(SessionError::AlreadyInProgress {
            phase: Phase::Preparing
        })
    );

    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Recording).await.unwrap();
    assert_eq!(
        h.session.start("sit_ups"),
        Err(SessionError::AlreadyInProgress {
            phase: Phase::Recording
        })
    );

    rx.wait_for(|s| s.phase == Phase::Scoring).await.unwrap();
    assert_eq!(
        h.session.start("sit_ups"),
        Err(SessionError::AlreadyInProgress {
            phase: Phase::Scoring
        })
    );

    // the original attempt is unaffected
    let state = h.session.settled().await;
    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.attempt_id, Some(attempt_id));
    assert_eq!(state.test_id.as_deref(), Some("push_ups"));
    assert_eq!(h.store.read_all().await.unwrap().len(), 1);
    assert_eq!(h.handoff.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_test_is_rejected_at_start() {
    let h = harness(ScriptedScorer::new());
    assert_eq!(
        h.session.start("long_jump"),
        Err(SessionError::UnknownTest("long_jump".to_string()))
    );
    assert_eq!(h.session.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_then_retry_rescores_same_video() {
    let scorer = Arc::new(ScriptedScorer::scoring(40.0).then_score(41.0));
    let h = harness_with(scorer.clone(), ScriptedCapture::new(VIDEO));
    h.blobs.set_reject_writes(true);

    h.session.start("sit_ups").unwrap();
    let state = h.session.settled().await;
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureKind::Persistence));
    assert!(state.last_error.unwrap().contains("write rejected"));
    assert_eq!(h.handoff.count(), 0);

    // a new attempt cannot start over an unacknowledged failure
    assert!(matches!(
        h.session.start("sit_ups"),
        Err(SessionError::InvalidTransition {
            operation: "start",
            ..
        })
    ));

    h.blobs.set_reject_writes(false);
    h.session.retry().unwrap();
    assert_eq!(h.session.snapshot().phase, Phase::Scoring);
    let state = h.session.settled().await;

    assert_eq!(state.phase, Phase::Complete);
    assert_eq!(state.failure, None);
    let stored = h.store.read_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].numeric_score(), Some(41.0));
    assert_eq!(h.handoff.count(), 1);
    assert_eq!(
        scorer.submitted(),
        vec![VideoRef::new(VIDEO), VideoRef::new(VIDEO)]
    );
    assert_eq!(h.capture.begins(), 1);
}

#[tokio::test(start_paused = true)]
async fn hardware_failure_has_nothing_to_retry() {
    let h = harness_with(
        Arc::new(ScriptedScorer::scoring(40.0)),
        ScriptedCapture::new(VIDEO).failing_on_begin("camera unavailable"),
    );

    h.session.start("flexibility").unwrap();
    let state = h.session.settled().await;
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureKind::Hardware));
    assert!(state.last_video_ref.is_none());
    assert!(state.last_error.unwrap().contains("camera unavailable"));

    assert_eq!(h.session.retry(), Err(SessionError::NothingToRetry));
    h.session.acknowledge().unwrap();
    assert_eq!(h.session.snapshot().phase, Phase::Idle);
    assert!(h.store.read_all().await.unwrap().is_empty());
    assert_eq!(h.blobs.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn reset_and_acknowledge_guard_their_phase() {
    let h = harness(ScriptedScorer::scoring(25.0).then_score(26.0));

    assert!(h.session.reset().is_ok());
    assert!(matches!(
        h.session.acknowledge(),
        Err(SessionError::InvalidTransition {
            operation: "acknowledge",
            phase: Phase::Idle
        })
    ));
    assert!(matches!(
        h.session.retry(),
        Err(SessionError::InvalidTransition {
            operation: "retry",
            ..
        })
    ));

    h.session.start("push_ups").unwrap();
    h.session.settled().await;
    h.session.reset().unwrap();
    assert_eq!(h.session.snapshot(), Default::default());

    // start is also allowed straight from Complete
    h.session.start("push_ups").unwrap();
    h.session.settled().await;
    let second = h.session.start("push_ups");
    assert!(second.is_ok());
    h.session.settled().await;
    assert_eq!(h.store.read_all().await.unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn discard_during_recording_stores_nothing() {
    let h = harness(ScriptedScorer::scoring(25.0));

    h.session.start("vertical_jump").unwrap();
    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Recording).await.unwrap();
    h.session.discard().unwrap();

    assert_eq!(h.session.snapshot().phase, Phase::Idle);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.session.snapshot().phase, Phase::Idle);
    assert_eq!(h.capture.finishes(), 0);
    assert!(h.store.read_all().await.unwrap().is_empty());
    assert_eq!(h.handoff.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn scoring_cannot_be_discarded() {
    let h = harness(ScriptedScorer::scoring(25.0).with_delay(Duration::from_secs(5)));

    h.session.start("push_ups").unwrap();
    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Scoring).await.unwrap();
    assert!(matches!(
        h.session.discard(),
        Err(SessionError::InvalidTransition {
            operation: "discard",
            phase: Phase::Scoring
        })
    ));
    assert_eq!(h.session.settled().await.phase, Phase::Complete);
}

#[tokio::test(start_paused = true)]
async fn capture_failure_at_finish_fails_without_committing() {
    let scorer = Arc::new(ScriptedScorer::scoring(40.0));
    let h = harness_with(
        scorer.clone(),
        ScriptedCapture::new(VIDEO).failing_on_finish("recording could not be saved"),
    );

    h.session.start("vertical_jump").unwrap();
    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Recording && s.recording_remaining < 10)
        .await
        .unwrap();

    let state = h.session.settled().await;
    assert_eq!(state.phase, Phase::Failed);
    assert_eq!(state.failure, Some(FailureKind::Hardware));
    assert!(state.last_video_ref.is_none());
    assert!(state
        .last_error
        .unwrap()
        .contains("recording could not be saved"));
    assert_eq!(h.capture.begins(), 1);
    assert_eq!(h.capture.finishes(), 1);

    assert!(scorer.submitted().is_empty());
    assert!(h.store.read_all().await.unwrap().is_empty());
    assert_eq!(h.handoff.count(), 0);
    assert_eq!(h.session.retry(), Err(SessionError::NothingToRetry));
}

#[tokio::test(start_paused = true)]
async fn late_and_stale_progress_is_ignored() {
    let scorer = Arc::new(LingeringScorer::default());
    let h = harness_with(scorer.clone(), ScriptedCapture::new(VIDEO));

    h.session.start("sit_ups").unwrap();
    let first = h.session.settled().await;
    assert_eq!(first.phase, Phase::Complete);
    assert_eq!(first.upload_fraction, 0.3);

    // after Complete
    let stale = scorer.reporter(0);
    stale.report(0.9);
    assert_eq!(h.session.snapshot().upload_fraction, 0.3);

    // while a newer attempt is scoring
    h.session.start("sit_ups").unwrap();
    let mut rx = h.session.subscribe();
    rx.wait_for(|s| s.phase == Phase::Scoring && s.upload_fraction > 0.0)
        .await
        .unwrap();
    stale.report(0.95);
    let during = h.session.snapshot();
    assert_ne!(during.attempt_id, first.attempt_id);
    assert_eq!(during.upload_fraction, 0.3);

    assert_eq!(h.session.settled().await.phase, Phase::Complete);
    assert_eq!(h.store.read_all().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn discard_racing_start_never_strands_an_attempt() {
    let session = CaptureSession::new(
        SessionConfig::default()
            .with_countdown_ticks(1)
            .with_tick(Duration::from_millis(2)),
        SessionParts {
            device: Arc::new(ScriptedCapture::new(VIDEO)),
            scorer: Arc::new(ScriptedScorer::new()),
            estimator: Arc::new(FixedEstimator::new(30.0)),
            store: ResultStore::new(Arc::new(MemoryBlobStore::new())),
            handoff: Arc::new(RecordingHandoff::new()),
        },
    );

    for round in 0..200 {
        session.start("push_ups").unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let discarding = {
            let (session, barrier) = (session.clone(), barrier.clone());
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                session.discard()
            })
        };
        let starting = {
            let (session, barrier) = (session.clone(), barrier.clone());
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                session.start("push_ups")
            })
        };
        let _ = discarding.await.unwrap();
        let restarted = starting.await.unwrap();

        if restarted.is_ok() {
            // the winning attempt must have a live task behind it
            let mut rx = session.subscribe();
            let advanced = tokio::time::timeout(
                Duration::from_secs(2),
                rx.wait_for(|s| s.phase != Phase::Preparing),
            )
            .await
            .is_ok();
            assert!(advanced, "round {round}: attempt stranded in Preparing");
        }

        if session.discard().is_err() {
            // caught in Scoring
            session.settled().await;
            session.reset().unwrap();
        }
    }
}
