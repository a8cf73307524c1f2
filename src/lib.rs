//! Bioscope - Biometric Aggregation and Analysis Sync
//!
//! Collects daily biometric readings from a wearable health store, aggregates
//! them per metric, uploads them to a remote analysis service and caches the
//! hormone and immunity scores the service derives, keyed by calendar date.

pub mod analysis;
pub mod cache;
pub mod metrics;
pub mod sources;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use analysis::{AnalysisClient, DerivedScores, HealthDataEntry};
pub use cache::DateKeyedResultCache;
pub use metrics::{MetricAggregator, MetricCatalog, MetricId, MetricSnapshot};
pub use sources::{BiometricSource, ConfiguredSource};
pub use storage::config::AppConfig;
pub use sync::{DailySync, SyncError};
