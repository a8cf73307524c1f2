//! Metric type catalog.
//!
//! Static table of the biometric quantities tracked by the application, with
//! the aggregation policy and display formatting for each one.

use serde::{Deserialize, Serialize};

use super::types::AggregationError;

/// Identifier of a tracked biometric metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricId {
    /// Walking/running step count
    StepCount,
    /// Heart rate in beats per minute
    HeartRate,
    /// Body temperature in degrees Celsius
    BodyTemperature,
    /// Active energy burned in kilocalories
    ActiveEnergyBurned,
    /// Blood oxygen saturation as a fraction (0.0-1.0)
    OxygenSaturation,
    /// Systolic blood pressure in mmHg
    BloodPressureSystolic,
    /// Diastolic blood pressure in mmHg
    BloodPressureDiastolic,
}

impl MetricId {
    /// Every metric id known to the application.
    pub const ALL: [MetricId; 7] = [
        MetricId::StepCount,
        MetricId::HeartRate,
        MetricId::BodyTemperature,
        MetricId::ActiveEnergyBurned,
        MetricId::OxygenSaturation,
        MetricId::BloodPressureSystolic,
        MetricId::BloodPressureDiastolic,
    ];

    /// Stable string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::StepCount => "stepCount",
            MetricId::HeartRate => "heartRate",
            MetricId::BodyTemperature => "bodyTemperature",
            MetricId::ActiveEnergyBurned => "activeEnergyBurned",
            MetricId::OxygenSaturation => "oxygenSaturation",
            MetricId::BloodPressureSystolic => "bloodPressureSystolic",
            MetricId::BloodPressureDiastolic => "bloodPressureDiastolic",
        }
    }

    /// How samples of this metric collapse over a window.
    ///
    /// Cumulative quantities are summed, instantaneous ones averaged.
    pub fn aggregation_policy(&self) -> AggregationPolicy {
        match self {
            MetricId::StepCount | MetricId::ActiveEnergyBurned => AggregationPolicy::Sum,
            _ => AggregationPolicy::Average,
        }
    }

    /// Field name used for this metric in the analysis service payload.
    pub fn wire_field(&self) -> &'static str {
        match self {
            MetricId::StepCount => "steps",
            MetricId::HeartRate => "heart_rate",
            MetricId::BodyTemperature => "body_temperature",
            MetricId::ActiveEnergyBurned => "exercise_kcal",
            MetricId::OxygenSaturation => "blood_oxygen",
            MetricId::BloodPressureSystolic => "systolic_bp",
            MetricId::BloodPressureDiastolic => "diastolic_bp",
        }
    }

    /// Convert an aggregated value to the unit the analysis service expects.
    ///
    /// Oxygen saturation is stored as a fraction but sent as a percentage.
    pub fn wire_value(&self, value: f64) -> f64 {
        match self {
            MetricId::OxygenSaturation => value * 100.0,
            _ => value,
        }
    }
}

impl std::fmt::Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MetricId {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AggregationError::UnknownMetric(s.to_string()))
    }
}

/// Rule for collapsing the samples in a window into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationPolicy {
    /// Sum of all samples (cumulative quantities)
    Sum,
    /// Arithmetic mean of all samples (instantaneous quantities)
    Average,
}

/// Display formatting applied to an aggregated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatRule {
    /// Truncated to a whole number ("8123")
    Integer,
    /// Rounded to one decimal place ("36.5")
    OneDecimal,
    /// Rounded to a whole number ("121")
    Whole,
    /// Fraction rendered as a percentage with one decimal ("97.0")
    Percent,
}

impl FormatRule {
    /// Render a full-precision value.
    pub fn apply(&self, value: f64) -> String {
        match self {
            FormatRule::Integer => format!("{}", value.trunc() as i64),
            FormatRule::OneDecimal => format!("{:.1}", value),
            FormatRule::Whole => format!("{:.0}", value),
            FormatRule::Percent => format!("{:.1}", value * 100.0),
        }
    }
}

/// One row of the metric catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Metric identifier
    pub id: MetricId,
    /// Human readable name
    pub display_name: &'static str,
    /// Display unit
    pub unit: &'static str,
    /// Aggregation policy over a time window
    pub aggregation_policy: AggregationPolicy,
    /// Display formatting rule
    pub format_rule: FormatRule,
}

impl CatalogEntry {
    /// Standard catalog row for a metric.
    pub fn standard(id: MetricId) -> Self {
        let (display_name, unit, format_rule) = match id {
            MetricId::StepCount => ("Steps", "steps", FormatRule::Integer),
            MetricId::HeartRate => ("Heart rate", "bpm", FormatRule::OneDecimal),
            MetricId::BodyTemperature => ("Body temperature", "℃", FormatRule::OneDecimal),
            MetricId::ActiveEnergyBurned => ("Active energy", "kcal", FormatRule::Integer),
            MetricId::OxygenSaturation => ("Blood oxygen", "%", FormatRule::Percent),
            MetricId::BloodPressureSystolic => ("Systolic BP", "mmHg", FormatRule::Whole),
            MetricId::BloodPressureDiastolic => ("Diastolic BP", "mmHg", FormatRule::Whole),
        };

        Self {
            id,
            display_name,
            unit,
            aggregation_policy: id.aggregation_policy(),
            format_rule,
        }
    }
}

/// Ordered, immutable table of tracked metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl MetricCatalog {
    /// The full catalog of every metric, in report order.
    pub fn standard() -> Self {
        Self::with_metrics(&MetricId::ALL)
    }

    /// Catalog restricted to the given metrics, in the given order.
    ///
    /// Duplicate ids keep their first position.
    pub fn with_metrics(ids: &[MetricId]) -> Self {
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(ids.len());
        for id in ids {
            if !entries.iter().any(|e| e.id == *id) {
                entries.push(CatalogEntry::standard(*id));
            }
        }
        Self { entries }
    }

    /// Catalog entries in insertion order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Metric ids in insertion order.
    pub fn ids(&self) -> Vec<MetricId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Look up the entry for a metric.
    pub fn entry(&self, id: MetricId) -> Result<&CatalogEntry, AggregationError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| AggregationError::UnknownMetric(id.to_string()))
    }

    pub fn aggregation_policy(&self, id: MetricId) -> Result<AggregationPolicy, AggregationError> {
        self.entry(id).map(|e| e.aggregation_policy)
    }

    pub fn format_rule(&self, id: MetricId) -> Result<FormatRule, AggregationError> {
        self.entry(id).map(|e| e.format_rule)
    }

    /// Format a value for display using the metric's rule.
    pub fn format(&self, id: MetricId, value: f64) -> Result<String, AggregationError> {
        self.format_rule(id).map(|rule| rule.apply(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
