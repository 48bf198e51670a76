//! Deterministic stand-ins for the session's collaborators (testing only)
//!
//! Provides `FixedEstimator`, `ScriptedScorer`, `ScriptedCapture` and
//! `RecordingHandoff`. Combine with `assess_state::fakes::MemoryBlobStore`
//! to drive a full attempt without hardware, network or disk.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use assess_state::{AssessmentResult, ResultSource, Score};
use async_trait::async_trait;
use chrono::Utc;

use crate::capture::{CaptureDevice, CaptureError, Handoff, ResultHandoff, VideoRef};
use crate::catalog::TestDefinition;
use crate::estimator::Estimator;
use crate::scoring::{ProgressReporter, ScoreError, Scorer};

fn result_for(
    test: &TestDefinition,
    video: &VideoRef,
    score: f64,
    source: ResultSource,
) -> AssessmentResult {
    AssessmentResult {
        test_id: test.id.to_string(),
        test_name: test.name.to_string(),
        timestamp: Utc::now(),
        video_ref: video.to_string(),
        score: Score::Number(score),
        unit: test.unit.to_string(),
        attempts: vec![Score::Number(score)],
        confidence: 0.9,
        technique_notes: Vec::new(),
        source,
    }
}

// ---------------------------------------------------------------------------
// FixedEstimator
// ---------------------------------------------------------------------------

/// Estimator that always returns the same score, with no delay.
#[derive(Debug)]
pub struct FixedEstimator {
    score: f64,
    calls: AtomicUsize,
}

impl FixedEstimator {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Estimator for FixedEstimator {
    async fn estimate(&self, test: &TestDefinition, video_ref: &VideoRef) -> AssessmentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        result_for(test, video_ref, self.score, ResultSource::Local)
    }
}

// ---------------------------------------------------------------------------
// ScriptedScorer
// ---------------------------------------------------------------------------

/// Scorer that replays a queue of outcomes. When the queue is empty every
/// submission fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedScorer {
    script: Mutex<VecDeque<Result<f64, ScoreError>>>,
    submitted: Mutex<Vec<VideoRef>>,
    delay: Duration,
}

impl ScriptedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorer whose first submission succeeds with `score`.
    pub fn scoring(score: f64) -> Self {
        Self::new().then_score(score)
    }

    /// Scorer whose first submission fails with `err`.
    pub fn failing(err: ScoreError) -> Self {
        Self::new().then_fail(err)
    }

    pub fn then_score(self, score: f64) -> Self {
        self.script.lock().unwrap().push_back(Ok(score));
        self
    }

    pub fn then_fail(self, err: ScoreError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    /// Time spent "uploading" before the outcome is returned.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Videos submitted so far, in order.
    pub fn submitted(&self) -> Vec<VideoRef> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scorer for ScriptedScorer {
    async fn submit(
        &self,
        test: &TestDefinition,
        video: &VideoRef,
        progress: &ProgressReporter,
    ) -> Result<AssessmentResult, ScoreError> {
        self.submitted.lock().unwrap().push(video.clone());
        let next = self.script.lock().unwrap().pop_front();

        progress.report(0.5);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match next {
            Some(Ok(score)) => {
                progress.finish();
                Ok(result_for(test, video, score, ResultSource::Remote))
            }
            Some(Err(err)) => Err(err),
            None => Err(ScoreError::Transport("no scripted response".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedCapture
// ---------------------------------------------------------------------------

/// Capture device that yields a fixed video, or fails on demand.
#[derive(Debug)]
pub struct ScriptedCapture {
    video: VideoRef,
    fail_begin: Option<String>,
    fail_finish: Option<String>,
    begins: AtomicUsize,
    finishes: AtomicUsize,
}

impl ScriptedCapture {
    pub fn new(video: impl Into<VideoRef>) -> Self {
        Self {
            video: video.into(),
            fail_begin: None,
            fail_finish: None,
            begins: AtomicUsize::new(0),
            finishes: AtomicUsize::new(0),
        }
    }

    pub fn failing_on_begin(mut self, message: &str) -> Self {
        self.fail_begin = Some(message.to_string());
        self
    }

    pub fn failing_on_finish(mut self, message: &str) -> Self {
        self.fail_finish = Some(message.to_string());
        self
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn finishes(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for ScriptedCapture {
    async fn begin(&self, _max_duration: Duration) -> Result<(), CaptureError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        match &self.fail_begin {
            Some(message) => Err(CaptureError::Hardware(message.clone())),
            None => Ok(()),
        }
    }

    async fn finish(&self) -> Result<VideoRef, CaptureError> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        match &self.fail_finish {
            Some(message) => Err(CaptureError::Hardware(message.clone())),
            None => Ok(self.video.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingHandoff
// ---------------------------------------------------------------------------

/// Hand-off target that remembers everything it receives.
#[derive(Debug, Default)]
pub struct RecordingHandoff {
    received: Mutex<Vec<Handoff>>,
}

impl RecordingHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Handoff> {
        self.received.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultHandoff for RecordingHandoff {
    async fn hand_off(&self, handoff: Handoff) {
        self.received.lock().unwrap().push(handoff);
    }
}
