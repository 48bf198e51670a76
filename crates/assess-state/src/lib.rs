//! Assess-State: persistence layer for athlete assessments
//!
//! This crate owns everything that outlives a single attempt: the append-only
//! result log and the read-only athlete profile.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: durable keyed blobs, atomic read-modify-write of the result log.
//!
//! ## Key Components
//!
//! - `BlobStore`: keyed durable blob storage (filesystem or in-memory)
//! - `ResultStore`: ordered result log stored under the `testResults` key
//! - `AssessmentResult`: schema of one completed attempt
//! - `AthleteProfile`: read-only profile stored under the `athleteProfile` key

mod error;
pub mod fakes;
mod fs_store;
pub mod profile;
pub mod result_store;
mod schema;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_store::FsBlobStore;
pub use profile::load_profile;
pub use result_store::ResultStore;
pub use schema::{AssessmentResult, AthleteProfile, ResultSource, Score};
pub use storage_traits::{BlobStore, StorageResult, PROFILE_KEY, RESULTS_KEY};
