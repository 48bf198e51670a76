//! Normative benchmark thresholds by test, gender and age band.
//!
//! Read-only reference data. Thresholds are in the unit of the test; for
//! lower-is-better tests (timed runs) the thresholds ascend from
//! `excellent` to `poor`.

use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::TestDefinition;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchmarkError {
    #[error("no benchmark data for test {test_id}")]
    NotFound { test_id: String },

    #[error("age {age} is outside every benchmark age band")]
    AgeOutOfRange { age: u32 },

    #[error("unknown gender: {value:?}")]
    UnknownGender { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(BenchmarkError::UnknownGender {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed, non-overlapping age bands, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "8-12")]
    Ages8To12,
    #[serde(rename = "13-17")]
    Ages13To17,
    #[serde(rename = "18-25")]
    Ages18To25,
    #[serde(rename = "26-35")]
    Ages26To35,
}

impl AgeBand {
    pub const ALL: [AgeBand; 4] = [
        AgeBand::Ages8To12,
        AgeBand::Ages13To17,
        AgeBand::Ages18To25,
        AgeBand::Ages26To35,
    ];

    /// Band used when an out-of-range age is clamped.
    pub const DEFAULT: AgeBand = AgeBand::Ages18To25;

    pub fn range(&self) -> RangeInclusive<u32> {
        match self {
            AgeBand::Ages8To12 => 8..=12,
            AgeBand::Ages13To17 => 13..=17,
            AgeBand::Ages18To25 => 18..=25,
            AgeBand::Ages26To35 => 26..=35,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Ages8To12 => "8-12",
            AgeBand::Ages13To17 => "13-17",
            AgeBand::Ages18To25 => "18-25",
            AgeBand::Ages26To35 => "26-35",
        }
    }

    pub fn from_age(age: u32) -> Option<AgeBand> {
        Self::ALL.into_iter().find(|band| band.range().contains(&age))
    }

    fn index(&self) -> usize {
        match self {
            AgeBand::Ages8To12 => 0,
            AgeBand::Ages13To17 => 1,
            AgeBand::Ages18To25 => 2,
            AgeBand::Ages26To35 => 3,
        }
    }
}

/// What to do with an age that falls outside every band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgePolicy {
    /// Report `AgeOutOfRange`.
    #[default]
    Strict,
    /// Silently use [`AgeBand::DEFAULT`].
    ClampToDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub excellent: f64,
    pub good: f64,
    pub average: f64,
    pub poor: f64,
}

const fn row(excellent: f64, good: f64, average: f64, poor: f64) -> BenchmarkRow {
    BenchmarkRow {
        excellent,
        good,
        average,
        poor,
    }
}

struct TestBenchmarks {
    test_id: &'static str,
    /// Indexed by `AgeBand::index`.
    male: [BenchmarkRow; 4],
    female: [BenchmarkRow; 4],
}

impl TestBenchmarks {
    fn rows(&self, gender: Gender) -> &[BenchmarkRow; 4] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }
}

static STANDARD: &[TestBenchmarks] = &[
    TestBenchmarks {
        test_id: "vertical_jump",
        male: [
            row(35.0, 28.0, 22.0, 15.0),
            row(45.0, 38.0, 30.0, 22.0),
            row(50.0, 42.0, 35.0, 28.0),
            row(45.0, 38.0, 30.0, 23.0),
        ],
        female: [
            row(30.0, 24.0, 18.0, 12.0),
            row(38.0, 32.0, 25.0, 18.0),
            row(40.0, 34.0, 27.0, 20.0),
            row(35.0, 29.0, 22.0, 16.0),
        ],
    },
    TestBenchmarks {
        test_id: "shuttle_run",
        male: [
            row(11.5, 12.5, 13.5, 15.0),
            row(10.0, 11.0, 12.0, 13.5),
            row(9.5, 10.5, 11.5, 13.0),
            row(10.0, 11.0, 12.0, 13.5),
        ],
        female: [
            row(12.0, 13.0, 14.0, 15.5),
            row(11.0, 12.0, 13.0, 14.5),
            row(10.5, 11.5, 12.5, 14.0),
            row(11.0, 12.0, 13.0, 14.5),
        ],
    },
    TestBenchmarks {
        test_id: "sit_ups",
        male: [
            row(35.0, 28.0, 22.0, 15.0),
            row(45.0, 38.0, 30.0, 22.0),
            row(50.0, 42.0, 35.0, 25.0),
            row(45.0, 38.0, 30.0, 20.0),
        ],
        female: [
            row(30.0, 24.0, 18.0, 12.0),
            row(40.0, 32.0, 25.0, 18.0),
            row(42.0, 35.0, 28.0, 20.0),
            row(38.0, 30.0, 23.0, 15.0),
        ],
    },
    TestBenchmarks {
        test_id: "flexibility",
        male: [
            row(20.0, 15.0, 10.0, 5.0),
            row(25.0, 20.0, 15.0, 8.0),
            row(30.0, 25.0, 18.0, 10.0),
            row(25.0, 20.0, 15.0, 8.0),
        ],
        female: [
            row(25.0, 20.0, 15.0, 8.0),
            row(30.0, 25.0, 20.0, 12.0),
            row(35.0, 30.0, 23.0, 15.0),
            row(30.0, 25.0, 20.0, 12.0),
        ],
    },
];

/// Benchmark lookup over the standard reference data.
#[derive(Debug, Clone, Copy, Default)]
pub struct BenchmarkTable {
    policy: AgePolicy,
}

impl BenchmarkTable {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: AgePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AgePolicy {
        self.policy
    }

    fn entry(&self, test_id: &str) -> Result<&'static TestBenchmarks, BenchmarkError> {
        STANDARD
            .iter()
            .find(|t| t.test_id == test_id)
            .ok_or_else(|| BenchmarkError::NotFound {
                test_id: test_id.to_string(),
            })
    }

    /// Resolve an age to its band according to the table's policy.
    pub fn resolve_band(&self, age: u32) -> Result<AgeBand, BenchmarkError> {
        match (AgeBand::from_age(age), self.policy) {
            (Some(band), _) => Ok(band),
            (None, AgePolicy::ClampToDefault) => Ok(AgeBand::DEFAULT),
            (None, AgePolicy::Strict) => Err(BenchmarkError::AgeOutOfRange { age }),
        }
    }

    /// Thresholds for `(test, gender, age)`.
    pub fn lookup(
        &self,
        test_id: &str,
        gender: Gender,
        age: u32,
    ) -> Result<BenchmarkRow, BenchmarkError> {
        let entry = self.entry(test_id)?;
        let band = self.resolve_band(age)?;
        Ok(entry.rows(gender)[band.index()])
    }

    /// Direction of comparison for a benchmarked test, as declared by the
    /// test catalog.
    pub fn higher_is_better(&self, test_id: &str) -> Option<bool> {
        self.entry(test_id).ok()?;
        TestDefinition::lookup(test_id).map(|t| t.higher_is_better)
    }

    /// Every band's thresholds for `(test, gender)`, youngest first.
    pub fn bands(
        &self,
        test_id: &str,
        gender: Gender,
    ) -> Result<Vec<(AgeBand, BenchmarkRow)>, BenchmarkError> {
        let entry = self.entry(test_id)?;
        Ok(AgeBand::ALL
            .into_iter()
            .map(|band| (band, entry.rows(gender)[band.index()]))
            .collect())
    }

    /// Ids of all tests with benchmark data.
    pub fn test_ids(&self) -> impl Iterator<Item = &'static str> {
        STANDARD.iter().map(|t| t.test_id)
    }
}
