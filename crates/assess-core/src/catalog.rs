//! Fixed catalog of supported fitness tests.

use serde::Serialize;

/// Recording ceiling for tests without a dedicated duration.
pub const DEFAULT_RECORDING_SECS: u32 = 15;

/// One supported test type. Created once from [`CATALOG`]; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub higher_is_better: bool,
    pub recording_duration_secs: u32,
}

impl TestDefinition {
    /// Look up a test by id.
    pub fn lookup(id: &str) -> Option<&'static TestDefinition> {
        CATALOG.iter().find(|t| t.id == id)
    }

    /// Iterate the whole catalog in display order.
    pub fn all() -> impl Iterator<Item = &'static TestDefinition> {
        CATALOG.iter()
    }
}

pub static CATALOG: &[TestDefinition] = &[
    TestDefinition {
        id: "vertical_jump",
        name: "Vertical Jump Test",
        unit: "cm",
        higher_is_better: true,
        recording_duration_secs: 10,
    },
    TestDefinition {
        id: "shuttle_run",
        name: "Shuttle Run (4x10m)",
        unit: "seconds",
        higher_is_better: false,
        recording_duration_secs: DEFAULT_RECORDING_SECS,
    },
    TestDefinition {
        id: "sit_ups",
        name: "Sit-ups Test",
        unit: "repetitions",
        higher_is_better: true,
        recording_duration_secs: 20,
    },
    TestDefinition {
        id: "push_ups",
        name: "Push-ups Test",
        unit: "repetitions",
        higher_is_better: true,
        recording_duration_secs: 20,
    },
    TestDefinition {
        id: "flexibility",
        name: "Flexibility Test",
        unit: "cm",
        higher_is_better: true,
        recording_duration_secs: 10,
    },
    TestDefinition {
        id: "endurance_run",
        name: "Endurance Run",
        unit: "meters",
        higher_is_better: true,
        recording_duration_secs: DEFAULT_RECORDING_SECS,
    },
];
