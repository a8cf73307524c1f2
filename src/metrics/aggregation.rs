//! Metric aggregation coordinator.
//!
//! Fans out one query per catalog entry against a biometric source and joins
//! every outcome into a [`MetricSnapshot`]. A failing or empty query degrades
//! only its own metric.

use futures::future::join_all;

use super::catalog::{MetricCatalog, MetricId};
use super::types::{AggregationError, MetricSnapshot, Outcome, TimeWindow};
use crate::sources::{BiometricSource, SourceError};

/// Stateless coordinator over a metric catalog.
#[derive(Debug, Clone, Default)]
pub struct MetricAggregator {
    catalog: MetricCatalog,
}

impl MetricAggregator {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Request source access for every metric in the catalog.
    pub async fn prepare<S: BiometricSource>(&self, source: &S) -> Result<(), SourceError> {
        source.request_access(&self.catalog.ids()).await
    }

    /// Query every catalog metric concurrently and join the results.
    ///
    /// Outcomes keep catalog order regardless of completion order. Only a
    /// source that does not serve a catalog metric fails the whole call.
    pub async fn aggregate<S: BiometricSource>(
        &self,
        source: &S,
        window: TimeWindow,
    ) -> Result<MetricSnapshot, AggregationError> {
        let queries = self.catalog.entries().iter().map(|entry| async move {
            let result = source.query(entry.id, window).await;
            (entry.id, result)
        });

        let results = join_all(queries).await;

        let mut outcomes: Vec<(MetricId, Outcome)> = Vec::with_capacity(results.len());
        for (metric, result) in results {
            let outcome = match result {
                Ok(Some(reading)) => Outcome::Value(reading.value),
                Ok(None) => Outcome::Unavailable,
                Err(SourceError::UnknownMetric(id)) => {
                    tracing::error!("Source does not serve catalog metric {}", id);
                    return Err(AggregationError::UnknownMetric(id.to_string()));
                }
                Err(e) => {
                    tracing::warn!("Query for {} failed: {}", metric, e);
                    Outcome::Error(e.to_string())
                }
            };
            outcomes.push((metric, outcome));
        }

        let snapshot = MetricSnapshot::new(window, outcomes);
        tracing::debug!(
            "Aggregated {} metrics ({} failed)",
            snapshot.len(),
            snapshot.error_count()
        );

        Ok(snapshot)
    }
}
