//! Local fallback scoring.
//!
//! When the remote service is unavailable the session still produces a
//! result, drawn from a plausible per-test range. This is a declared
//! placeholder and never a real measurement; results are tagged
//! [`ResultSource::Local`].

use std::sync::Mutex;
use std::time::Duration;

use assess_state::{AssessmentResult, ResultSource, Score};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::VideoRef;
use crate::catalog::TestDefinition;

/// Artificial processing delay of the production estimator.
pub const DEFAULT_ESTIMATE_DELAY: Duration = Duration::from_secs(2);

/// Fallback scoring strategy used when remote scoring fails.
#[async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(&self, test: &TestDefinition, video_ref: &VideoRef) -> AssessmentResult;
}

/// Sampling parameters for one test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateProfile {
    pub min: f64,
    pub max: f64,
    pub attempts: usize,
    pub confidence: f64,
    /// Decimal places kept on sampled values.
    pub precision: u32,
    pub notes: &'static [&'static str],
}

const GENERIC_PROFILE: EstimateProfile = EstimateProfile {
    min: 10.0,
    max: 50.0,
    attempts: 1,
    confidence: 0.5,
    precision: 0,
    notes: &["Estimated locally; re-run when online for a full analysis"],
};

impl EstimateProfile {
    pub fn for_test(test_id: &str) -> EstimateProfile {
        match test_id {
            "vertical_jump" => EstimateProfile {
                min: 20.0,
                max: 49.0,
                attempts: 3,
                confidence: 0.95,
                precision: 0,
                notes: &["Good takeoff", "Improve landing"],
            },
            "push_ups" => EstimateProfile {
                min: 20.0,
                max: 39.0,
                attempts: 1,
                confidence: 0.9,
                precision: 0,
                notes: &["Full range", "Straight body"],
            },
            "sit_ups" => EstimateProfile {
                min: 25.0,
                max: 44.0,
                attempts: 1,
                confidence: 0.88,
                precision: 0,
                notes: &["Consistent form"],
            },
            "flexibility" => EstimateProfile {
                min: 5.0,
                max: 19.0,
                attempts: 3,
                confidence: 0.9,
                precision: 0,
                notes: &["Good flexibility"],
            },
            "shuttle_run" => EstimateProfile {
                min: 9.0,
                max: 14.0,
                attempts: 3,
                confidence: 0.85,
                precision: 1,
                notes: &["Quick turns", "Keep a low center of gravity"],
            },
            "endurance_run" => EstimateProfile {
                min: 1500.0,
                max: 3000.0,
                attempts: 1,
                confidence: 0.8,
                precision: 0,
                notes: &["Steady pacing"],
            },
            _ => GENERIC_PROFILE,
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        let scale = 10f64.powi(self.precision as i32);
        let lo = (self.min * scale).round() as i64;
        let hi = (self.max * scale).round() as i64;
        rng.gen_range(lo..=hi) as f64 / scale
    }
}

/// Production estimator: random draw from the test's plausible range.
pub struct LocalEstimator {
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl Default for LocalEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEstimator {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_ESTIMATE_DELAY,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible estimator for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            delay: DEFAULT_ESTIMATE_DELAY,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn draw(&self, profile: &EstimateProfile, higher_is_better: bool) -> (f64, Vec<f64>) {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        let attempts: Vec<f64> = (0..profile.attempts.max(1))
            .map(|_| profile.sample(&mut rng))
            .collect();
        let best = attempts.iter().copied().fold(None, |best: Option<f64>, v| {
            Some(match best {
                None => v,
                Some(b) if higher_is_better => b.max(v),
                Some(b) => b.min(v),
            })
        });
        (best.unwrap_or(profile.min), attempts)
    }
}

#[async_trait]
impl Estimator for LocalEstimator {
    async fn estimate(&self, test: &TestDefinition, video_ref: &VideoRef) -> AssessmentResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let profile = EstimateProfile::for_test(test.id);
        let (score, attempts) = self.draw(&profile, test.higher_is_better);

        AssessmentResult {
            test_id: test.id.to_string(),
            test_name: test.name.to_string(),
            timestamp: Utc::now(),
            video_ref: video_ref.to_string(),
            score: Score::Number(score),
            unit: test.unit.to_string(),
            attempts: attempts.into_iter().map(Score::Number).collect(),
            confidence: profile.confidence.clamp(0.0, 1.0),
            technique_notes: profile.notes.iter().map(|n| n.to_string()).collect(),
            source: ResultSource::Local,
        }
    }
}
