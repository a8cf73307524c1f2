//! HTTP client for the remote analysis service.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;

use super::types::{AnalysisError, DerivedScores, HealthDataPayload, ScoreKind};
use crate::cache::ReferenceZone;
use crate::storage::config::AnalysisSettings;

/// Client for the analysis service.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    /// HTTP client
    http: reqwest::Client,
    /// Base URL without trailing slash
    base_url: String,
}

impl AnalysisClient {
    /// Create a client from settings.
    pub fn new(settings: &AnalysisSettings) -> Result<Self, AnalysisError> {
        Self::with_base_url(&settings.base_url, Duration::from_secs(settings.timeout_secs))
    }

    /// Create a client for a custom base URL.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the metric endpoint for one kind and date.
    pub fn metric_url(&self, kind: ScoreKind, date: NaiveDate) -> String {
        format!(
            "{}/metrics/{}?date={}",
            self.base_url,
            kind.as_str(),
            ReferenceZone::format(date)
        )
    }

    /// Fetch one derived level.
    ///
    /// Returns `Ok(None)` when the service has no data for the date.
    pub async fn fetch_level(
        &self,
        kind: ScoreKind,
        date: NaiveDate,
    ) -> Result<Option<f64>, AnalysisError> {
        let url = self.metric_url(kind, date);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).send().await.map_err(map_send_error)?;
        let status = response.status();
        let body = response.text().await?;

        decode_level(kind, status, &body)
    }

    /// Fetch all derived scores for a date.
    ///
    /// The three kinds are requested concurrently. Returns `Ok(None)` if any
    /// kind has no data.
    pub async fn fetch_scores(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DerivedScores>, AnalysisError> {
        let (estrogen, cortisol, immunity) = futures::try_join!(
            self.fetch_level(ScoreKind::Estrogen, date),
            self.fetch_level(ScoreKind::Cortisol, date),
            self.fetch_level(ScoreKind::Immunity, date),
        )?;

        match (estrogen, cortisol, immunity) {
            (Some(estrogen), Some(cortisol), Some(immunity)) => Ok(Some(DerivedScores {
                estrogen,
                cortisol,
                immunity,
            })),
            _ => {
                tracing::debug!("No derived scores for {}", date);
                Ok(None)
            }
        }
    }

    /// Upload health data.
    pub async fn submit(&self, payload: &HealthDataPayload) -> Result<(), AnalysisError> {
        let url = format!("{}/healthdata", self.base_url);
        tracing::debug!("POST {} for {} on {}", url, payload.user_id, payload.date);

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status == StatusCode::OK {
            tracing::info!("Uploaded health data for {}", payload.date);
            Ok(())
        } else {
            tracing::warn!("Health data upload for {} rejected: {}", payload.date, status);
            Err(AnalysisError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

fn map_send_error(e: reqwest::Error) -> AnalysisError {
    if e.is_connect() || e.is_timeout() {
        AnalysisError::Network(e.to_string())
    } else {
        AnalysisError::from(e)
    }
}

/// Interpret a metric endpoint response.
pub fn decode_level(
    kind: ScoreKind,
    status: StatusCode,
    body: &str,
) -> Result<Option<f64>, AnalysisError> {
    if status == StatusCode::OK {
        let json: serde_json::Value = serde_json::from_str(body)?;
        let found = kind
            .accepted_keys()
            .find_map(|key| json.get(key).map(|value| (key, value)));
        match found {
            Some((key, serde_json::Value::Number(n))) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| AnalysisError::Decode(format!("{} is not finite", key))),
            // Insufficient-data marker
            Some((_, serde_json::Value::String(marker))) => {
                tracing::debug!("{} unavailable: {}", kind, marker);
                Ok(None)
            }
            Some((key, other)) => Err(AnalysisError::Decode(format!(
                "{} has unexpected value {}",
                key, other
            ))),
            None => Err(AnalysisError::Decode(format!("missing {}", kind.level_key()))),
        }
    } else if status == StatusCode::NOT_FOUND {
        Ok(None)
    } else if status.is_server_error() {
        Err(AnalysisError::Server {
            status: status.as_u16(),
        })
    } else {
        Err(AnalysisError::UnexpectedStatus {
            status: status.as_u16(),
        })
    }
}
