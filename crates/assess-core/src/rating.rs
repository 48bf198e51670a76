//! Converts a raw score into a qualitative tier.
//!
//! Rating never fails: missing benchmark data, an unknown gender or a
//! score that is not a finite number all degrade to a sentinel rating.

use assess_state::{AssessmentResult, AthleteProfile, Score};
use serde::Serialize;

use crate::benchmark::{BenchmarkError, BenchmarkRow, BenchmarkTable, Gender};
use crate::catalog::TestDefinition;

/// Display color for sentinel ratings.
pub const NEUTRAL_COLOR: &str = "#666666";

/// Qualitative tiers, most desirable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl Tier {
    /// 0 for the best tier, increasing as desirability drops.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Excellent => 0,
            Tier::Good => 1,
            Tier::Average => 2,
            Tier::NeedsImprovement => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Excellent => "Excellent",
            Tier::Good => "Good",
            Tier::Average => "Average",
            Tier::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Tier::Excellent => "#4CAF50",
            Tier::Good => "#8BC34A",
            Tier::Average => "#FF9800",
            Tier::NeedsImprovement => "#f44336",
        }
    }

    /// Classify `score` against one row of thresholds. Boundaries are
    /// inclusive.
    pub fn classify(score: f64, row: &BenchmarkRow, higher_is_better: bool) -> Tier {
        let meets = |threshold: f64| {
            if higher_is_better {
                score >= threshold
            } else {
                score <= threshold
            }
        };
        if meets(row.excellent) {
            Tier::Excellent
        } else if meets(row.good) {
            Tier::Good
        } else if meets(row.average) {
            Tier::Average
        } else {
            Tier::NeedsImprovement
        }
    }
}

/// Outcome of rating one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tier", rename_all = "snake_case")]
pub enum Rating {
    Tier(Tier),
    /// No benchmark data applies (unknown test or gender, unusable score).
    NotFound,
    /// The age falls outside every band and the table is strict.
    AgeOutOfRange,
}

impl Rating {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Rating::Tier(tier) => Some(*tier),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Tier(tier) => tier.label(),
            Rating::NotFound => "Not Found",
            Rating::AgeOutOfRange => "Age Out Of Range",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Rating::Tier(tier) => tier.color(),
            Rating::NotFound | Rating::AgeOutOfRange => NEUTRAL_COLOR,
        }
    }
}

impl From<BenchmarkError> for Rating {
    fn from(err: BenchmarkError) -> Self {
        match err {
            BenchmarkError::AgeOutOfRange { .. } => Rating::AgeOutOfRange,
            BenchmarkError::NotFound { .. } | BenchmarkError::UnknownGender { .. } => {
                Rating::NotFound
            }
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RatingEngine {
    table: BenchmarkTable,
}

impl RatingEngine {
    pub fn new(table: BenchmarkTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &BenchmarkTable {
        &self.table
    }

    /// Rate a numeric score for an athlete of the given gender and age.
    pub fn rate(&self, test_id: &str, score: f64, gender: &str, age: u32) -> Rating {
        if !score.is_finite() {
            return Rating::NotFound;
        }
        let gender: Gender = match gender.parse() {
            Ok(g) => g,
            Err(err) => return Rating::from(err),
        };
        let Some(test) = TestDefinition::lookup(test_id) else {
            return Rating::NotFound;
        };
        match self.table.lookup(test.id, gender, age) {
            Ok(row) => Rating::Tier(Tier::classify(score, &row, test.higher_is_better)),
            Err(err) => Rating::from(err),
        }
    }

    /// Rate a stored score, which may be a numeric string.
    pub fn rate_score(&self, test_id: &str, score: &Score, gender: &str, age: u32) -> Rating {
        match score.as_f64() {
            Some(value) => self.rate(test_id, value, gender, age),
            None => Rating::NotFound,
        }
    }

    /// Rate a stored result against the athlete profile. A profile
    /// without gender or age yields `NotFound`.
    pub fn rate_result(&self, result: &AssessmentResult, profile: &AthleteProfile) -> Rating {
        match (profile.gender.as_deref(), profile.age) {
            (Some(gender), Some(age)) => {
                self.rate_score(&result.test_id, &result.score, gender, age)
            }
            _ => Rating::NotFound,
        }
    }
}
