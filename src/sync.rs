//! Daily health data synchronization.
//!
//! Ties the biometric source, the aggregator, the analysis client and the
//! score cache together. Two paths upload data for a date:
//!
//! - wearable: aggregate the source over the day and post the snapshot
//! - manual: validate a typed-in [`HealthDataEntry`] and post it
//!
//! Both invalidate the cached scores for the date so the next load re-fetches.

use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::analysis::{
    AnalysisClient, AnalysisError, DerivedScores, HealthDataEntry, HealthDataPayload,
    ValidationError,
};
use crate::cache::{CacheEntry, CacheState, DateKeyedResultCache, ReferenceZone};
use crate::metrics::aggregation::MetricAggregator;
use crate::metrics::types::{AggregationError, MetricSnapshot, TimeWindow};
use crate::sources::{BiometricSource, ConfiguredSource, HealthStoreError, SourceError};
use crate::storage::config::AppConfig;

/// Errors from a sync operation.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Health store error: {0}")]
    HealthStore(#[from] HealthStoreError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Manual entry failed validation
    #[error("Invalid entry: {}", format_violations(.0))]
    Invalid(Vec<ValidationError>),

    /// Aggregation produced no values to upload
    #[error("No health data recorded for {0}")]
    NothingToUpload(NaiveDate),
}

fn format_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Orchestrates uploads and score loading for calendar dates.
pub struct DailySync<S> {
    source: S,
    aggregator: MetricAggregator,
    client: AnalysisClient,
    cache: DateKeyedResultCache<DerivedScores>,
    user_id: String,
}

impl DailySync<ConfiguredSource> {
    /// Build every component from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, SyncError> {
        let source = ConfiguredSource::from_settings(&config.source)?;
        let client = AnalysisClient::new(&config.analysis)?;
        let cache = DateKeyedResultCache::new(
            config.cache.reference_zone(),
            config.cache.install_policy,
        );

        Ok(Self::new(source, client, cache, &config.source.user_id))
    }
}

impl<S: BiometricSource> DailySync<S> {
    pub fn new(
        source: S,
        client: AnalysisClient,
        cache: DateKeyedResultCache<DerivedScores>,
        user_id: &str,
    ) -> Self {
        Self {
            source,
            aggregator: MetricAggregator::default(),
            client,
            cache,
            user_id: user_id.to_string(),
        }
    }

    /// Replace the aggregator (and with it the catalog).
    pub fn with_aggregator(mut self, aggregator: MetricAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn aggregator(&self) -> &MetricAggregator {
        &self.aggregator
    }

    pub fn cache(&self) -> &DateKeyedResultCache<DerivedScores> {
        &self.cache
    }

    pub fn zone(&self) -> ReferenceZone {
        self.cache.zone()
    }

    /// Window aggregated for a date: the whole day, or up to now for today.
    pub fn window_for(&self, date: NaiveDate) -> TimeWindow {
        let zone = self.zone();
        if date == zone.today() {
            TimeWindow::today_so_far(&zone.offset())
        } else {
            zone.day_window(date)
        }
    }

    /// Aggregate the source over a date.
    pub async fn snapshot(&self, date: NaiveDate) -> Result<MetricSnapshot, SyncError> {
        self.aggregator.prepare(&self.source).await?;
        let snapshot = self.aggregator.aggregate(&self.source, self.window_for(date)).await?;
        Ok(snapshot)
    }

    /// Aggregate a date from the source and upload it.
    ///
    /// Partial snapshots are uploaded; a snapshot without any value is not.
    pub async fn sync_wearable(&self, date: NaiveDate) -> Result<MetricSnapshot, SyncError> {
        let snapshot = self.snapshot(date).await?;
        if snapshot.is_empty() {
            return Err(SyncError::NothingToUpload(date));
        }

        let birth_date = match self.source.birth_date().await {
            Ok(birth_date) => birth_date,
            Err(e) => {
                tracing::warn!("Birth date unavailable: {}", e);
                None
            }
        };

        let payload = HealthDataPayload::from_snapshot(
            &self.user_id,
            date,
            &snapshot,
            self.source.label(),
            birth_date,
        );
        self.client.submit(&payload).await?;
        self.cache.invalidate(date);

        tracing::info!(
            "Synced {} metrics from {} for {}",
            snapshot.wire_fields().len(),
            self.source.label(),
            date
        );
        Ok(snapshot)
    }

    /// Validate and upload a manual entry.
    pub async fn submit_entry(&self, entry: &HealthDataEntry) -> Result<(), SyncError> {
        let violations = entry.validate();
        if !violations.is_empty() {
            return Err(SyncError::Invalid(violations));
        }

        self.client.submit(&entry.to_payload()).await?;
        self.cache.invalidate(entry.date);
        Ok(())
    }

    /// Start loading derived scores for a date unless they are already
    /// loaded or loading.
    pub fn request_scores(&self, date: NaiveDate) -> Option<JoinHandle<()>> {
        if !matches!(self.cache.get(date).state, CacheState::NotFetched) {
            return None;
        }

        let client = self.client.clone();
        self.cache
            .ensure_fetched(date, move || async move { client.fetch_scores(date).await })
    }

    /// Load derived scores for a date and return the settled entry.
    ///
    /// If another caller's fetch is in flight the entry is returned as
    /// `Fetching`.
    pub async fn load_scores(&self, date: NaiveDate) -> CacheEntry<DerivedScores> {
        if let Some(handle) = self.request_scores(date) {
            if let Err(e) = handle.await {
                tracing::warn!("Score fetch task for {} did not complete: {}", date, e);
            }
        }
        self.cache.get(date)
    }
}
