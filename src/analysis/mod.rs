//! Remote analysis service.
//!
//! Uploads health data and fetches the scores the service derives from it.

pub mod client;
pub mod entry;
pub mod types;

pub use client::AnalysisClient;
pub use entry::{HealthDataEntry, ValidationError};
pub use types::{AnalysisError, DerivedScores, FieldValue, HealthDataPayload, ScoreKind};
