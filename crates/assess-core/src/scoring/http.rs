//! HTTP client for the analysis service.

use std::time::Duration;

use assess_state::{AssessmentResult, ResultSource, Score};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::{ProgressReporter, ScoreError, Scorer};
use crate::capture::VideoRef;
use crate::catalog::TestDefinition;
use crate::config::ScoringConfig;

/// Upload chunk size; one progress delivery per chunk.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Confidence assumed when the service omits one.
const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Scorer backed by `POST <base_url>/analyze`.
pub struct HttpScorer {
    config: ScoringConfig,
    client: reqwest::Client,
}

impl HttpScorer {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoreError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScoreError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, ScoreError> {
        Self::new(ScoringConfig::from_env())
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn endpoint(&self) -> Result<String, ScoreError> {
        let base = self.config.base_url().ok_or(ScoreError::Configuration)?;
        Ok(format!("{}/analyze", base.trim_end_matches('/')))
    }

    async fn video_part(
        &self,
        video: &VideoRef,
        progress: &ProgressReporter,
    ) -> Result<Part, ScoreError> {
        let bytes = tokio::fs::read(video.as_path())
            .await
            .map_err(|source| ScoreError::Video {
                path: video.to_string(),
                source,
            })?;
        // chunks are slices of this one buffer
        let data = Bytes::from(bytes);
        let total = data.len();

        let reporter = progress.clone();
        let body = futures::stream::iter((0..total).step_by(UPLOAD_CHUNK_BYTES).map(
            move |start| {
                let end = (start + UPLOAD_CHUNK_BYTES).min(total);
                reporter.report(end as f64 / total as f64);
                Ok::<_, std::io::Error>(data.slice(start..end))
            },
        ));

        Part::stream_with_length(reqwest::Body::wrap_stream(body), total as u64)
            .file_name("video.mp4")
            .mime_str("video/mp4")
            .map_err(|e| ScoreError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn submit(
        &self,
        test: &TestDefinition,
        video: &VideoRef,
        progress: &ProgressReporter,
    ) -> Result<AssessmentResult, ScoreError> {
        let endpoint = self.endpoint()?;
        let form = Form::new()
            .part("file", self.video_part(video, progress).await?)
            .text("testId", test.id.to_string())
            .text(
                "includeTraces",
                if self.config.include_traces {
                    "true"
                } else {
                    "false"
                },
            );

        debug!(endpoint = %endpoint, test_id = %test.id, "submitting video for analysis");
        let response = self
            .client
            .post(&endpoint)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScoreError::Transport(e.to_string()))?;

        // the body is fully sent once a response exists
        progress.finish();

        let status = response.status();
        if !status.is_success() {
            let details = response.json::<serde_json::Value>().await.ok();
            return Err(ScoreError::Remote {
                status: status.as_u16(),
                details,
            });
        }

        let analysis: RemoteAnalysis = response
            .json()
            .await
            .map_err(|e| ScoreError::InvalidResponse(e.to_string()))?;
        analysis.into_result(test, video)
    }
}

/// Success payload of the analysis service. Everything but `score` is
/// optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAnalysis {
    test_name: Option<String>,
    timestamp: Option<String>,
    score: Option<Score>,
    unit: Option<String>,
    attempts: Option<Vec<Score>>,
    confidence: Option<f64>,
    #[serde(rename = "technique_notes")]
    technique_notes: Option<Vec<String>>,
}

impl RemoteAnalysis {
    fn into_result(
        self,
        test: &TestDefinition,
        video: &VideoRef,
    ) -> Result<AssessmentResult, ScoreError> {
        let score = self
            .score
            .ok_or_else(|| ScoreError::InvalidResponse("response has no score".to_string()))?;
        let timestamp = self
            .timestamp
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let confidence = self
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0);

        Ok(AssessmentResult {
            test_id: test.id.to_string(),
            test_name: self.test_name.unwrap_or_else(|| test.name.to_string()),
            timestamp,
            video_ref: video.to_string(),
            score,
            unit: self.unit.unwrap_or_else(|| test.unit.to_string()),
            attempts: self.attempts.unwrap_or_default(),
            confidence,
            technique_notes: self.technique_notes.unwrap_or_default(),
            source: ResultSource::Remote,
        })
    }
}
