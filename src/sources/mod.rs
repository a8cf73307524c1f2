//! Biometric data sources.
//!
//! A [`BiometricSource`] answers aggregated queries for one metric over a time
//! window. Two variants exist: [`MockSource`] with a fixed record set and
//! [`DeviceSource`] backed by a platform health store. [`ConfiguredSource`]
//! selects between them from configuration.

pub mod device;
pub mod mock;

use chrono::NaiveDate;
use thiserror::Error;

use crate::metrics::catalog::MetricId;
use crate::metrics::types::{Reading, TimeWindow};
use crate::storage::config::{SourceKind, SourceSettings};

pub use device::{DeviceSource, HealthStore, HealthStoreError, RecordedHealthStore, Sample};
pub use mock::MockSource;

/// Errors reported by a biometric source.
///
/// "No samples in window" is not an error; queries report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// User refused (or has not granted) read access
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Network or storage failure, safe to retry
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The source does not serve this metric
    #[error("Unknown metric: {0}")]
    UnknownMetric(MetricId),
}

impl SourceError {
    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

/// Capability interface over a biometric data store.
pub trait BiometricSource: Send + Sync {
    /// Request read access for the given metrics.
    ///
    /// Must succeed before [`query`](Self::query) is used. Idempotent.
    fn request_access(
        &self,
        metrics: &[MetricId],
    ) -> impl std::future::Future<Output = Result<(), SourceError>> + Send;

    /// Aggregate one metric over `[window.start, window.end)`.
    ///
    /// Returns `Ok(None)` when the window holds no samples.
    fn query(
        &self,
        metric: MetricId,
        window: TimeWindow,
    ) -> impl std::future::Future<Output = Result<Option<Reading>, SourceError>> + Send;

    /// User's date of birth, if the store knows it.
    fn birth_date(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<NaiveDate>, SourceError>> + Send;

    /// Short label sent as `source_type` with uploaded data.
    fn label(&self) -> &'static str;
}

/// Source variant chosen by configuration.
pub enum ConfiguredSource {
    Mock(MockSource),
    Device(DeviceSource<RecordedHealthStore>),
}

impl ConfiguredSource {
    /// Build the source described by the settings.
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, HealthStoreError> {
        match settings.kind {
            SourceKind::Mock => {
                tracing::info!("Using mock biometric source");
                Ok(ConfiguredSource::Mock(MockSource::new()))
            }
            SourceKind::Device => {
                let store = match &settings.samples_path {
                    Some(path) => RecordedHealthStore::load(path)?,
                    None => RecordedHealthStore::new(),
                };
                tracing::info!("Using device biometric source");
                Ok(ConfiguredSource::Device(DeviceSource::new(store)))
            }
        }
    }
}

impl BiometricSource for ConfiguredSource {
    async fn request_access(&self, metrics: &[MetricId]) -> Result<(), SourceError> {
        match self {
            ConfiguredSource::Mock(s) => s.request_access(metrics).await,
            ConfiguredSource::Device(s) => s.request_access(metrics).await,
        }
    }

    async fn query(
        &self,
        metric: MetricId,
        window: TimeWindow,
    ) -> Result<Option<Reading>, SourceError> {
        match self {
            ConfiguredSource::Mock(s) => s.query(metric, window).await,
            ConfiguredSource::Device(s) => s.query(metric, window).await,
        }
    }

    async fn birth_date(&self) -> Result<Option<NaiveDate>, SourceError> {
        match self {
            ConfiguredSource::Mock(s) => s.birth_date().await,
            ConfiguredSource::Device(s) => s.birth_date().await,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ConfiguredSource::Mock(s) => s.label(),
            ConfiguredSource::Device(s) => s.label(),
        }
    }
}
