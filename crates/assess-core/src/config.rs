//! Runtime configuration for scoring, sessions and storage.
//!
//! Each config reads its environment variables in `from_env()` and offers
//! `with_*` builders for overrides (the CLI applies its flags this way).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENV_API_BASE_URL: &str = "ASSESS_API_BASE_URL";
pub const ENV_INCLUDE_TRACES: &str = "ASSESS_INCLUDE_TRACES";
pub const ENV_SCORING_TIMEOUT_SECS: &str = "ASSESS_SCORING_TIMEOUT_SECS";
pub const ENV_DATA_DIR: &str = "ASSESS_DATA_DIR";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_DATA_DIR: &str = ".assess";

/// Remote scoring service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Service root; `None` (or empty) means scoring is unconfigured.
    pub base_url: Option<String>,
    /// Ask the service to return pose traces alongside the score.
    pub include_traces: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            base_url: None,
            include_traces: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("assess/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ScoringConfig {
    /// Build from `ASSESS_API_BASE_URL`, `ASSESS_INCLUDE_TRACES` and
    /// `ASSESS_SCORING_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        ScoringConfig {
            base_url: lookup(ENV_API_BASE_URL).filter(|u| !u.trim().is_empty()),
            include_traces: lookup(ENV_INCLUDE_TRACES)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.include_traces),
            timeout_secs: lookup(ENV_SCORING_TIMEOUT_SECS)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
            user_agent: defaults.user_agent,
        }
    }

    /// Config pointing at a specific service.
    pub fn new(base_url: &str) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string()).filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_include_traces(mut self, include: bool) -> Self {
        self.include_traces = include;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Trimmed base URL, if one is set.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.base_url().is_some()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Capture session timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Countdown ticks before recording starts.
    pub countdown_ticks: u32,
    /// Length of one countdown or recording tick.
    pub tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            countdown_ticks: 3,
            tick: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    pub fn with_countdown_ticks(mut self, ticks: u32) -> Self {
        self.countdown_ticks = ticks;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Location of the filesystem blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl StoreConfig {
    /// Build from `ASSESS_DATA_DIR`, defaulting to `.assess`.
    pub fn from_env() -> Self {
        match std::env::var(ENV_DATA_DIR) {
            Ok(dir) if !dir.trim().is_empty() => Self::new(dir),
            _ => Self::default(),
        }
    }

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_dir: data_dir.into(),
        }
    }
}
