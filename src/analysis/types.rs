//! Remote analysis service types and error definitions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::ReferenceZone;
use crate::metrics::types::MetricSnapshot;

/// Error types for analysis service calls.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Service answered with a 5xx status
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// Service answered with a status this client does not handle
    #[error("Unexpected response: HTTP {status}")]
    UnexpectedStatus { status: u16 },

    /// Upload was not accepted
    #[error("Upload rejected: HTTP {status}")]
    Rejected { status: u16 },

    /// Malformed response payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Client could not be constructed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Whether the same request may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Network(_) | AnalysisError::Server { .. })
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AnalysisError::Decode(err.to_string())
        } else {
            AnalysisError::Network(err.to_string())
        }
    }
}

/// Derived score kinds served by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Estrogen,
    Cortisol,
    Immunity,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 3] = [ScoreKind::Estrogen, ScoreKind::Cortisol, ScoreKind::Immunity];

    /// Path segment of the metric endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreKind::Estrogen => "estrogen",
            ScoreKind::Cortisol => "cortisol",
            ScoreKind::Immunity => "immunity",
        }
    }

    /// JSON key holding the level in a metric response.
    pub fn level_key(&self) -> &'static str {
        match self {
            ScoreKind::Estrogen => "estrogen_Level",
            ScoreKind::Cortisol => "cortisol_Level",
            ScoreKind::Immunity => "immunity_Level",
        }
    }

    /// Older key still sent by deployed services, read when `level_key` is absent.
    ///
    /// The immunity endpoint has reported its level as `immunity_Score`.
    pub fn fallback_key(&self) -> Option<&'static str> {
        match self {
            ScoreKind::Immunity => Some("immunity_Score"),
            _ => None,
        }
    }

    /// Keys accepted for the level, in lookup order.
    pub fn accepted_keys(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.level_key()).chain(self.fallback_key())
    }
}

impl std::fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scores derived by the analysis service for one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedScores {
    pub estrogen: f64,
    pub cortisol: f64,
    pub immunity: f64,
}

impl DerivedScores {
    pub fn get(&self, kind: ScoreKind) -> f64 {
        match kind {
            ScoreKind::Estrogen => self.estrogen,
            ScoreKind::Cortisol => self.cortisol,
            ScoreKind::Immunity => self.immunity,
        }
    }
}

/// Value of one raw field in an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Flag(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Body of `POST /healthdata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDataPayload {
    pub user_id: String,
    /// `yyyy-MM-dd` in the reference timezone
    pub date: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl HealthDataPayload {
    pub fn new(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date: ReferenceZone::format(date),
            fields: BTreeMap::new(),
        }
    }

    /// Add or replace a field.
    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Payload carrying every valued metric of a snapshot.
    pub fn from_snapshot(
        user_id: &str,
        date: NaiveDate,
        snapshot: &MetricSnapshot,
        source_type: &str,
        birth_date: Option<NaiveDate>,
    ) -> Self {
        let mut payload = Self::new(user_id, date).with_field("source_type", source_type);
        for (field, value) in snapshot.wire_fields() {
            payload = payload.with_field(field, value);
        }
        if let Some(birth_date) = birth_date {
            payload = payload.with_field("birthdate", ReferenceZone::format(birth_date).as_str());
        }
        payload
    }
}
