//! Deterministic mock biometric source.
//!
//! Returns the same record set on every call. Used to drive the application
//! and tests without a live health store.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;

use super::{BiometricSource, SourceError};
use crate::metrics::catalog::MetricId;
use crate::metrics::types::{Reading, TimeWindow};

/// Scripted answer for one metric.
#[derive(Debug, Clone, PartialEq)]
enum MockAnswer {
    Value(f64),
    Empty,
    Fail(SourceError),
}

/// Mock source with a fixed per-metric answer table.
#[derive(Debug, Clone)]
pub struct MockSource {
    answers: HashMap<MetricId, MockAnswer>,
    delays: HashMap<MetricId, Duration>,
    birth_date: Option<NaiveDate>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Create the standard mock record set.
    pub fn new() -> Self {
        let answers = [
            (MetricId::StepCount, 8123.0),
            (MetricId::HeartRate, 72.4),
            (MetricId::BodyTemperature, 36.47),
            (MetricId::ActiveEnergyBurned, 412.0),
            (MetricId::OxygenSaturation, 0.975),
            (MetricId::BloodPressureSystolic, 118.0),
            (MetricId::BloodPressureDiastolic, 76.0),
        ]
        .into_iter()
        .map(|(id, v)| (id, MockAnswer::Value(v)))
        .collect();

        Self {
            answers,
            delays: HashMap::new(),
            birth_date: NaiveDate::from_ymd_opt(1985, 6, 14),
        }
    }

    /// Override the value returned for a metric.
    pub fn with_value(mut self, metric: MetricId, value: f64) -> Self {
        self.answers.insert(metric, MockAnswer::Value(value));
        self
    }

    /// Report no samples for a metric.
    pub fn with_no_samples(mut self, metric: MetricId) -> Self {
        self.answers.insert(metric, MockAnswer::Empty);
        self
    }

    /// Fail queries for a metric with the given error.
    pub fn with_failure(mut self, metric: MetricId, error: SourceError) -> Self {
        self.answers.insert(metric, MockAnswer::Fail(error));
        self
    }

    /// Delay the answer for a metric.
    pub fn with_delay(mut self, metric: MetricId, delay: Duration) -> Self {
        self.delays.insert(metric, delay);
        self
    }

    /// Set (or clear) the reported date of birth.
    pub fn with_birth_date(mut self, birth_date: Option<NaiveDate>) -> Self {
        self.birth_date = birth_date;
        self
    }
}

impl BiometricSource for MockSource {
    async fn request_access(&self, metrics: &[MetricId]) -> Result<(), SourceError> {
        tracing::debug!("Mock source granting access to {} metrics", metrics.len());
        Ok(())
    }

    async fn query(
        &self,
        metric: MetricId,
        window: TimeWindow,
    ) -> Result<Option<Reading>, SourceError> {
        if let Some(delay) = self.delays.get(&metric) {
            tokio::time::sleep(*delay).await;
        }

        match self.answers.get(&metric) {
            Some(MockAnswer::Value(value)) => Ok(Some(Reading {
                metric,
                value: *value,
                timestamp: window.end,
            })),
            Some(MockAnswer::Empty) => Ok(None),
            Some(MockAnswer::Fail(error)) => Err(error.clone()),
            None => Err(SourceError::UnknownMetric(metric)),
        }
    }

    async fn birth_date(&self) -> Result<Option<NaiveDate>, SourceError> {
        Ok(self.birth_date)
    }

    fn label(&self) -> &'static str {
        "mock"
    }
}
