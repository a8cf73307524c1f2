//! Integration tests for the analysis service client against a mock server.

use std::time::Duration;

use bioscope::analysis::{AnalysisClient, AnalysisError, HealthDataPayload, ScoreKind};
use chrono::NaiveDate;
use httpmock::prelude::*;
use serde_json::json;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 18).unwrap()
}

fn client_for(server: &MockServer) -> AnalysisClient {
    AnalysisClient::with_base_url(&server.base_url(), Duration::from_secs(5)).unwrap()
}

/// Serve one level for a score kind on the test date.
async fn mock_level<'a>(
    server: &'a MockServer,
    kind: &str,
    status: u16,
    body: serde_json::Value,
) -> httpmock::Mock<'a> {
    let path = format!("/metrics/{}", kind);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path).query_param("date", "2025-02-18");
            then.status(status).json_body(body);
        })
        .await
}

#[tokio::test]
async fn test_fetch_scores() {
    let server = MockServer::start_async().await;
    let estrogen = mock_level(&server, "estrogen", 200, json!({"estrogen_Level": 61.2})).await;
    let cortisol = mock_level(&server, "cortisol", 200, json!({"cortisol_Level": 12.5})).await;
    let immunity = mock_level(&server, "immunity", 200, json!({"immunity_Level": 78.0})).await;
    let client = client_for(&server);

    let scores = client.fetch_scores(date()).await.unwrap().unwrap();
    assert_eq!(scores.get(ScoreKind::Estrogen), 61.2);
    assert_eq!(scores.cortisol, 12.5);
    assert_eq!(scores.immunity, 78.0);

    estrogen.assert_hits_async(1).await;
    cortisol.assert_hits_async(1).await;
    immunity.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_immunity_score_key_accepted() {
    let server = MockServer::start_async().await;
    let immunity = mock_level(&server, "immunity", 200, json!({"immunity_Score": 64.0})).await;
    let client = client_for(&server);

    let level = client.fetch_level(ScoreKind::Immunity, date()).await.unwrap();
    assert_eq!(level, Some(64.0));
    immunity.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_missing_kind_makes_date_empty() {
    let server = MockServer::start_async().await;
    mock_level(&server, "estrogen", 200, json!({"estrogen_Level": 61.2})).await;
    mock_level(&server, "cortisol", 404, json!({"detail": "not found"})).await;
    mock_level(&server, "immunity", 200, json!({"immunity_Level": 78.0})).await;
    let client = client_for(&server);

    assert_eq!(client.fetch_scores(date()).await.unwrap(), None);
}

#[tokio::test]
async fn test_insufficient_data_marker() {
    let server = MockServer::start_async().await;
    mock_level(&server, "estrogen", 200, json!({"estrogen_Level": "データ不足"})).await;
    let client = client_for(&server);

    let level = client.fetch_level(ScoreKind::Estrogen, date()).await.unwrap();
    assert_eq!(level, None);
}

#[tokio::test]
async fn test_server_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(503);
        })
        .await;
    let client = client_for(&server);

    let err = client.fetch_scores(date()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Server { status: 503 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_submit_payload() {
    let server = MockServer::start_async().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/healthdata").json_body(json!({
                "user_id": "user_001",
                "date": "2025-02-18",
                "steps": 8100.0,
                "source_type": "direct"
            }));
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;
    let client = client_for(&server);

    let payload = HealthDataPayload::new("user_001", date())
        .with_field("steps", 8100.0)
        .with_field("source_type", "direct");
    client.submit(&payload).await.unwrap();

    upload.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_submit_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/healthdata");
            then.status(422).json_body(json!({"detail": "bad"}));
        })
        .await;
    let client = client_for(&server);

    let err = client
        .submit(&HealthDataPayload::new("user_001", date()))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Rejected { status: 422 }));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let client =
        AnalysisClient::with_base_url("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = client.fetch_level(ScoreKind::Cortisol, date()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Network(_)));
}
