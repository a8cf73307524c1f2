//! Integration tests for aggregating a device health store.

use std::time::Duration;

use bioscope::cache::ReferenceZone;
use bioscope::metrics::{MetricAggregator, MetricCatalog, MetricId, Outcome};
use bioscope::sources::{
    BiometricSource, DeviceSource, MockSource, RecordedHealthStore, Sample, SourceError,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 18).unwrap()
}

/// Steps recorded twice during the day, no heart rate at all.
#[tokio::test]
async fn test_steps_summed_heart_rate_unavailable() {
    let store = RecordedHealthStore::new();
    store.record(Sample::new(
        MetricId::StepCount,
        4000.0,
        Utc.with_ymd_and_hms(2025, 2, 18, 1, 0, 0).unwrap(),
    ));
    store.record(Sample::new(
        MetricId::StepCount,
        4100.0,
        Utc.with_ymd_and_hms(2025, 2, 18, 6, 30, 0).unwrap(),
    ));
    let source = DeviceSource::new(store);

    let aggregator = MetricAggregator::new(MetricCatalog::with_metrics(&[
        MetricId::StepCount,
        MetricId::HeartRate,
    ]));
    aggregator.prepare(&source).await.unwrap();

    let window = ReferenceZone::default().day_window(date());
    let snapshot = aggregator.aggregate(&source, window).await.unwrap();

    assert_eq!(
        snapshot.outcomes(),
        &[
            (MetricId::StepCount, Outcome::Value(8100.0)),
            (MetricId::HeartRate, Outcome::Unavailable),
        ]
    );
    assert_eq!(
        snapshot.formatted(aggregator.catalog(), MetricId::StepCount),
        Some("8100".to_string())
    );
}

#[tokio::test]
async fn test_samples_outside_reference_day_ignored() {
    let store = RecordedHealthStore::new();
    // 2025-02-17 23:30 in UTC+09:00, the day before
    store.record(Sample::new(
        MetricId::StepCount,
        500.0,
        Utc.with_ymd_and_hms(2025, 2, 17, 14, 30, 0).unwrap(),
    ));
    store.record(Sample::new(
        MetricId::StepCount,
        1200.0,
        Utc.with_ymd_and_hms(2025, 2, 17, 15, 30, 0).unwrap(),
    ));
    let source = DeviceSource::new(store);

    let aggregator = MetricAggregator::new(MetricCatalog::with_metrics(&[MetricId::StepCount]));
    aggregator.prepare(&source).await.unwrap();
    let snapshot = aggregator
        .aggregate(&source, ReferenceZone::default().day_window(date()))
        .await
        .unwrap();

    assert_eq!(snapshot.value(MetricId::StepCount), Some(1200.0));
}

#[tokio::test]
async fn test_catalog_order_independent_of_completion_order() {
    let source = MockSource::new()
        .with_delay(MetricId::StepCount, Duration::from_millis(40))
        .with_delay(MetricId::HeartRate, Duration::from_millis(20))
        .with_failure(
            MetricId::BodyTemperature,
            SourceError::Transient("sensor offline".to_string()),
        );

    let aggregator = MetricAggregator::default();
    aggregator.prepare(&source).await.unwrap();
    let snapshot = aggregator
        .aggregate(&source, ReferenceZone::default().day_window(date()))
        .await
        .unwrap();

    let ids: Vec<MetricId> = snapshot.outcomes().iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, MetricId::ALL.to_vec());
    assert!(snapshot.get(MetricId::BodyTemperature).unwrap().is_error());
    assert_eq!(snapshot.error_count(), 1);
    assert_eq!(snapshot.value(MetricId::StepCount), Some(8123.0));
}

#[tokio::test]
async fn test_denied_store_reports_errors_per_metric() {
    let source = DeviceSource::new(RecordedHealthStore::new().with_denial("user declined"));
    let aggregator = MetricAggregator::default();

    assert!(matches!(
        aggregator.prepare(&source).await,
        Err(SourceError::AuthorizationDenied(_))
    ));

    let snapshot = aggregator
        .aggregate(&source, ReferenceZone::default().day_window(date()))
        .await
        .unwrap();
    assert_eq!(snapshot.error_count(), MetricId::ALL.len());
    assert_eq!(source.label(), "healthkit");
}
