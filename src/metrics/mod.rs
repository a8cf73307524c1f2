//! Metrics module for the biometric catalog and aggregation.

pub mod aggregation;
pub mod catalog;
pub mod types;

pub use aggregation::MetricAggregator;
pub use catalog::{AggregationPolicy, CatalogEntry, FormatRule, MetricCatalog, MetricId};
pub use types::{AggregationError, MetricSnapshot, Outcome, Reading, TimeWindow};
