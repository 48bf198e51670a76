//! Persisted record schema.
//!
//! Field names follow the JSON layout of the stored `testResults` log so
//! logs written by earlier clients keep decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A score as reported by the scoring service: either numeric or a numeric
/// string (older logs store `"42.5"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Number(f64),
    Text(String),
}

impl Score {
    /// Numeric value, if the score is finite or parses as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Score::Number(n) => *n,
            Score::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Score::Number(value)
    }
}

impl From<&str> for Score {
    fn from(value: &str) -> Self {
        Score::Text(value.to_string())
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Number(n) => write!(f, "{n}"),
            Score::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Where a result's score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResultSource {
    /// Remote scoring service.
    #[default]
    #[serde(rename = "api")]
    Remote,
    /// Local fallback estimator.
    #[serde(rename = "local")]
    Local,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Remote => "api",
            ResultSource::Local => "local",
        }
    }
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed assessment attempt. Immutable once created; corrections
/// are new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub test_id: String,
    pub test_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "videoUri", default)]
    pub video_ref: String,
    pub score: Score,
    pub unit: String,
    #[serde(default)]
    pub attempts: Vec<Score>,
    pub confidence: f64,
    #[serde(rename = "technique_notes", default)]
    pub technique_notes: Vec<String>,
    /// Records written before the source was tracked decode as `Remote`.
    #[serde(rename = "_source", default)]
    pub source: ResultSource,
}

impl AssessmentResult {
    /// Numeric score, if one can be derived.
    pub fn numeric_score(&self) -> Option<f64> {
        self.score.as_f64()
    }

    pub fn is_local_estimate(&self) -> bool {
        self.source == ResultSource::Local
    }
}

/// Athlete profile owned by the profile editor; read-only here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_age")]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    /// Remaining profile fields (height, weight, contact details, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Ages are typed into a text field upstream and may be stored as `"22"`.
fn deserialize_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    })
}
