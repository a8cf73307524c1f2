//! Shared metric types and error definitions.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{MetricCatalog, MetricId};

/// Errors that fail a whole aggregation pass.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// Metric id not registered in the catalog or not served by the source
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, swapping the bounds if they are reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// The calendar day `date` in the timezone `tz`.
    pub fn for_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let start = tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
        Self::new(start, start + Duration::days(1))
    }

    /// From the start of the current day in `tz` up to now.
    pub fn today_so_far<Tz: TimeZone>(tz: &Tz) -> Self {
        let now = Utc::now();
        let today = now.with_timezone(tz).date_naive();
        let start = Self::for_day(today, tz).start;
        Self::new(start, now)
    }

    /// Whether an instant falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// An aggregated reading produced by a biometric source query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub metric: MetricId,
    /// Full-precision aggregate over the query window
    pub value: f64,
    /// End of the sampled window
    pub timestamp: DateTime<Utc>,
}

/// Result of aggregating one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// Aggregated value at full precision
    Value(f64),
    /// No samples in the window
    Unavailable,
    /// Query failed
    Error(String),
}

impl Outcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// Joined result of one aggregation pass across the catalog.
///
/// Holds exactly one outcome per catalog entry, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    window: TimeWindow,
    outcomes: Vec<(MetricId, Outcome)>,
}

impl MetricSnapshot {
    pub(crate) fn new(window: TimeWindow, outcomes: Vec<(MetricId, Outcome)>) -> Self {
        Self { window, outcomes }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Outcomes in catalog order.
    pub fn outcomes(&self) -> &[(MetricId, Outcome)] {
        &self.outcomes
    }

    pub fn get(&self, id: MetricId) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(metric, _)| *metric == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn value(&self, id: MetricId) -> Option<f64> {
        self.get(id).and_then(Outcome::value)
    }

    /// Display string for a metric, or `None` if it has no value.
    pub fn formatted(&self, catalog: &MetricCatalog, id: MetricId) -> Option<String> {
        let value = self.value(id)?;
        catalog.format(id, value).ok()
    }

    /// True when no metric produced a value.
    pub fn is_empty(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.value().is_none())
    }

    /// Number of metrics whose query failed.
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Values keyed by their analysis service field names.
    ///
    /// Metrics without a value are omitted.
    pub fn wire_fields(&self) -> Vec<(&'static str, f64)> {
        self.outcomes
            .iter()
            .filter_map(|(id, o)| o.value().map(|v| (id.wire_field(), id.wire_value(v))))
            .collect()
    }
}
