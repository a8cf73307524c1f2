//! Device health store adapter.
//!
//! [`DeviceSource`] turns raw samples from a [`HealthStore`] into aggregated
//! readings. Platform integrations implement [`HealthStore`]; this crate ships
//! [`RecordedHealthStore`], which serves samples recorded in memory or loaded
//! from a JSON export.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BiometricSource, SourceError};
use crate::metrics::catalog::{AggregationPolicy, MetricId};
use crate::metrics::types::{Reading, TimeWindow};

/// Errors raised by a platform health store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HealthStoreError {
    /// Read authorization refused
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// Storage or IPC failure
    #[error("IO error: {0}")]
    Io(String),

    /// The store has no such quantity type
    #[error("Unsupported quantity type: {0}")]
    Unsupported(MetricId),

    /// Sample export could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<HealthStoreError> for SourceError {
    fn from(err: HealthStoreError) -> Self {
        match err {
            HealthStoreError::Denied(reason) => SourceError::AuthorizationDenied(reason),
            HealthStoreError::Unsupported(metric) => SourceError::UnknownMetric(metric),
            HealthStoreError::Io(reason) | HealthStoreError::Parse(reason) => {
                SourceError::Transient(reason)
            }
        }
    }
}

/// One raw quantity sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub metric: MetricId,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn new(metric: MetricId, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric,
            value,
            timestamp,
        }
    }
}

/// Platform data provider wrapped by [`DeviceSource`].
pub trait HealthStore: Send + Sync {
    /// Ask the platform for read access to the given quantity types.
    fn request_authorization(
        &self,
        metrics: &[MetricId],
    ) -> impl std::future::Future<Output = Result<(), HealthStoreError>> + Send;

    /// Raw samples of `metric` inside the window.
    fn samples(
        &self,
        metric: MetricId,
        window: TimeWindow,
    ) -> impl std::future::Future<Output = Result<Vec<Sample>, HealthStoreError>> + Send;

    /// Date of birth characteristic.
    fn date_of_birth(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<NaiveDate>, HealthStoreError>> + Send;
}

/// Biometric source backed by a platform health store.
pub struct DeviceSource<S> {
    store: S,
    granted: RwLock<HashSet<MetricId>>,
}

impl<S: HealthStore> DeviceSource<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            granted: RwLock::new(HashSet::new()),
        }
    }

    /// Access to the wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn is_granted(&self, metric: MetricId) -> bool {
        self.granted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&metric)
    }
}

/// Collapse samples into one value per the aggregation policy.
///
/// Returns `None` when there are no samples.
pub fn collapse(policy: AggregationPolicy, samples: &[Sample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sum: f64 = samples.iter().map(|s| s.value).sum();
    match policy {
        AggregationPolicy::Sum => Some(sum),
        AggregationPolicy::Average => Some(sum / samples.len() as f64),
    }
}

impl<S: HealthStore> BiometricSource for DeviceSource<S> {
    async fn request_access(&self, metrics: &[MetricId]) -> Result<(), SourceError> {
        let missing: Vec<MetricId> = metrics
            .iter()
            .copied()
            .filter(|m| !self.is_granted(*m))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        self.store.request_authorization(&missing).await.map_err(|e| {
            tracing::warn!("Health store authorization failed: {}", e);
            SourceError::from(e)
        })?;

        self.granted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(missing.iter().copied());

        tracing::info!("Health store access granted for {} metrics", missing.len());
        Ok(())
    }

    async fn query(
        &self,
        metric: MetricId,
        window: TimeWindow,
    ) -> Result<Option<Reading>, SourceError> {
        if !self.is_granted(metric) {
            return Err(SourceError::AuthorizationDenied(format!(
                "read access not granted for {}",
                metric
            )));
        }

        let samples: Vec<Sample> = self
            .store
            .samples(metric, window)
            .await?
            .into_iter()
            .filter(|s| s.metric == metric && window.contains(s.timestamp))
            .collect();

        let value = collapse(metric.aggregation_policy(), &samples);
        if value.is_none() {
            tracing::debug!("No {} samples in window", metric);
        }

        Ok(value.map(|value| Reading {
            metric,
            value,
            timestamp: window.end,
        }))
    }

    async fn birth_date(&self) -> Result<Option<NaiveDate>, SourceError> {
        Ok(self.store.date_of_birth().await?)
    }

    fn label(&self) -> &'static str {
        "healthkit"
    }
}

/// On-disk layout of a recorded sample export.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SampleExport {
    #[serde(default)]
    birth_date: Option<NaiveDate>,
    #[serde(default)]
    samples: Vec<Sample>,
}

/// In-memory health store holding recorded samples.
#[derive(Debug, Default)]
pub struct RecordedHealthStore {
    samples: RwLock<Vec<Sample>>,
    birth_date: Option<NaiveDate>,
    denial: Option<String>,
    failures: HashMap<MetricId, String>,
}

impl RecordedHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load samples from a JSON export file.
    pub fn load(path: &Path) -> Result<Self, HealthStoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HealthStoreError::Io(format!("{}: {}", path.display(), e)))?;
        let export: SampleExport =
            serde_json::from_str(&content).map_err(|e| HealthStoreError::Parse(e.to_string()))?;

        tracing::info!(
            "Loaded {} recorded samples from {}",
            export.samples.len(),
            path.display()
        );

        Ok(Self {
            samples: RwLock::new(export.samples),
            birth_date: export.birth_date,
            ..Default::default()
        })
    }

    /// Append a sample.
    pub fn record(&self, sample: Sample) {
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    /// Refuse every authorization request.
    pub fn with_denial(mut self, reason: &str) -> Self {
        self.denial = Some(reason.to_string());
        self
    }

    /// Fail sample reads for a metric with an IO error.
    pub fn with_io_failure(mut self, metric: MetricId, reason: &str) -> Self {
        self.failures.insert(metric, reason.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HealthStore for RecordedHealthStore {
    async fn request_authorization(&self, _metrics: &[MetricId]) -> Result<(), HealthStoreError> {
        match &self.denial {
            Some(reason) => Err(HealthStoreError::Denied(reason.clone())),
            None => Ok(()),
        }
    }

    async fn samples(
        &self,
        metric: MetricId,
        window: TimeWindow,
    ) -> Result<Vec<Sample>, HealthStoreError> {
        if let Some(reason) = self.failures.get(&metric) {
            return Err(HealthStoreError::Io(reason.clone()));
        }

        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        Ok(samples
            .iter()
            .filter(|s| s.metric == metric && window.contains(s.timestamp))
            .copied()
            .collect())
    }

    async fn date_of_birth(&self) -> Result<Option<NaiveDate>, HealthStoreError> {
        Ok(self.birth_date)
    }
}
