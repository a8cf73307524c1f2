//! End-to-end tests of the wearable and manual upload paths.

use std::time::Duration;

use bioscope::analysis::{AnalysisClient, HealthDataEntry};
use bioscope::cache::{CacheState, DateKeyedResultCache};
use bioscope::metrics::MetricId;
use bioscope::sources::{MockSource, SourceError};
use bioscope::storage::config::{self, AppConfig};
use bioscope::{DailySync, SyncError};
use chrono::NaiveDate;
use httpmock::prelude::*;
use serde_json::json;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 18).unwrap()
}

fn sync_for(server: &MockServer, source: MockSource) -> DailySync<MockSource> {
    let client =
        AnalysisClient::with_base_url(&server.base_url(), Duration::from_secs(5)).unwrap();
    DailySync::new(source, client, DateKeyedResultCache::default(), "user_001")
}

/// Every metric endpoint answers "no data".
async fn mock_no_scores(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/metrics/");
            then.status(404);
        })
        .await
}

/// Every metric endpoint answers a level of 50.
async fn mock_scores(server: &MockServer) -> Vec<httpmock::Mock<'_>> {
    let mut mocks = Vec::new();
    for kind in ["estrogen", "cortisol", "immunity"] {
        let mock = server
            .mock_async(|when, then| {
                let mut body = serde_json::Map::new();
                body.insert(format!("{}_Level", kind), json!(50.0));
                when.method(GET).path(format!("/metrics/{}", kind));
                then.status(200).json_body(serde_json::Value::Object(body));
            })
            .await;
        mocks.push(mock);
    }
    mocks
}

#[tokio::test]
async fn test_wearable_sync_invalidates_scores() {
    let server = MockServer::start_async().await;
    let mut missing = mock_no_scores(&server).await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/healthdata").json_body_partial(
                json!({
                    "user_id": "user_001",
                    "date": "2025-02-18",
                    "source_type": "mock",
                    "steps": 8123.0,
                    "blood_oxygen": 97.5,
                    "birthdate": "1985-06-14"
                })
                .to_string(),
            );
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    let source = MockSource::new()
        .with_no_samples(MetricId::BodyTemperature)
        .with_failure(
            MetricId::HeartRate,
            SourceError::Transient("watch disconnected".to_string()),
        );
    let sync = sync_for(&server, source);

    assert_eq!(sync.load_scores(date()).await.state, CacheState::Empty);
    missing.assert_hits_async(3).await;

    let snapshot = sync.sync_wearable(date()).await.unwrap();
    upload.assert_hits_async(1).await;
    assert_eq!(snapshot.error_count(), 1);
    let fields: Vec<&str> = snapshot.wire_fields().iter().map(|(f, _)| *f).collect();
    assert!(!fields.contains(&"heart_rate"));
    assert!(!fields.contains(&"body_temperature"));
    assert_eq!(sync.cache().get(date()).state, CacheState::NotFetched);

    missing.delete_async().await;
    let levels = mock_scores(&server).await;

    let entry = sync.load_scores(date()).await;
    let scores = entry.value().unwrap();
    assert_eq!(scores.estrogen, 50.0);
    assert_eq!(scores.immunity, 50.0);
    for mock in &levels {
        mock.assert_hits_async(1).await;
    }
}

#[tokio::test]
async fn test_loaded_scores_served_from_cache() {
    let server = MockServer::start_async().await;
    let levels = mock_scores(&server).await;
    let sync = sync_for(&server, MockSource::new());

    sync.load_scores(date()).await;
    sync.load_scores(date()).await;
    for mock in &levels {
        mock.assert_hits_async(1).await;
    }
}

#[tokio::test]
async fn test_manual_entry_sync() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/healthdata").json_body_partial(
                json!({
                    "user_id": "test_user_1",
                    "source_type": "direct",
                    "exercise_habit": true,
                    "sleep_duration": 7.5
                })
                .to_string(),
            );
            then.status(200);
        })
        .await;
    let levels = mock_scores(&server).await;
    let sync = sync_for(&server, MockSource::new());

    let entry: HealthDataEntry = serde_json::from_str(
        r#"{
            "user_id": "test_user_1",
            "date": "2025-02-18",
            "age": 34, "height": 162, "weight": 54, "body_fat": 24,
            "exercise_habit": true, "exercise_kcal": 320, "steps": 8100,
            "sleep_duration": 7.5, "systolic_bp": 112, "diastolic_bp": 72,
            "body_temperature": 36.5, "heart_rate": 68
        }"#,
    )
    .unwrap();

    sync.submit_entry(&entry).await.unwrap();
    upload.assert_hits_async(1).await;

    let scores = sync.load_scores(date()).await;
    assert_eq!(scores.value().unwrap().cortisol, 50.0);
    assert_eq!(levels[1].hits_async().await, 1);
}

#[tokio::test]
async fn test_invalid_entry_never_posted() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/healthdata");
            then.status(200);
        })
        .await;
    let sync = sync_for(&server, MockSource::new());

    let entry = HealthDataEntry {
        heart_rate: 250.0,
        ..HealthDataEntry::new(date())
    };
    let err = sync.submit_entry(&entry).await.unwrap_err();
    assert!(matches!(err, SyncError::Invalid(_)));
    upload.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_from_config_file() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/healthdata")
                .json_body_partial(json!({"user_id": "user_042"}).to_string());
            then.status(200);
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut app_config = AppConfig::default();
    app_config.analysis.base_url = server.base_url();
    app_config.source.user_id = "user_042".to_string();
    config::save_to(&app_config, &path).unwrap();

    let loaded = config::load_from(&path).unwrap();
    let sync = DailySync::from_config(&loaded).unwrap();
    sync.sync_wearable(date()).await.unwrap();

    upload.assert_hits_async(1).await;
}
