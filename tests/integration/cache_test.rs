//! Integration tests for the date-keyed score cache under concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bioscope::analysis::{AnalysisClient, DerivedScores};
use bioscope::cache::{CacheState, DateKeyedResultCache, DisplayStatus, ReferenceZone};
use chrono::{NaiveDate, TimeZone, Utc};
use httpmock::prelude::*;

fn date() -> NaiveDate {
    ReferenceZone::parse("2025-02-18").unwrap()
}

fn scores() -> DerivedScores {
    DerivedScores {
        estrogen: 61.2,
        cortisol: 12.5,
        immunity: 78.0,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_fetch_once() {
    let cache: DateKeyedResultCache<DerivedScores> = DateKeyedResultCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache.ensure_fetched(date(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, String>(Some(scores()))
                })
            })
        })
        .collect();

    let mut started = Vec::new();
    for task in tasks {
        if let Some(handle) = task.await.unwrap() {
            started.push(handle);
        }
    }

    assert_eq!(started.len(), 1);
    for handle in started {
        handle.await.unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(date()).value(), Some(&scores()));
}

#[tokio::test]
async fn test_not_found_is_empty_not_failed() {
    let server = MockServer::start_async().await;
    let metrics = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/metrics/");
            then.status(404);
        })
        .await;
    let client =
        AnalysisClient::with_base_url(&server.base_url(), Duration::from_secs(5)).unwrap();
    let cache: DateKeyedResultCache<DerivedScores> = DateKeyedResultCache::default();

    cache
        .ensure_fetched(date(), move || async move { client.fetch_scores(date()).await })
        .unwrap()
        .await
        .unwrap();

    let entry = cache.get(date());
    assert_eq!(entry.state, CacheState::Empty);
    assert_eq!(entry.state.display_status(), DisplayStatus::NoData);
    metrics.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_server_error_is_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(500);
        })
        .await;
    let client =
        AnalysisClient::with_base_url(&server.base_url(), Duration::from_secs(5)).unwrap();
    let cache: DateKeyedResultCache<DerivedScores> = DateKeyedResultCache::default();

    cache
        .ensure_fetched(date(), move || async move { client.fetch_scores(date()).await })
        .unwrap()
        .await
        .unwrap();

    let entry = cache.get(date());
    assert_eq!(entry.state.display_status(), DisplayStatus::CouldNotLoad);
    assert!(entry.error_message().unwrap().contains("500"));
}

#[tokio::test]
async fn test_invalidate_triggers_new_fetch() {
    let cache: DateKeyedResultCache<DerivedScores> = DateKeyedResultCache::default();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        cache
            .ensure_fetched(date(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(scores()))
            })
            .unwrap()
            .await
            .unwrap();
        cache.invalidate(date());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get(date()).state, CacheState::NotFetched);
}

#[test]
fn test_keys_follow_reference_zone() {
    let cache: DateKeyedResultCache<DerivedScores> = DateKeyedResultCache::default();
    // 2025-02-17 20:00 UTC is already the 18th in UTC+09:00
    let instant = Utc.with_ymd_and_hms(2025, 2, 17, 20, 0, 0).unwrap();
    assert_eq!(cache.key_for(&instant), date());

    let utc_cache: DateKeyedResultCache<DerivedScores> = DateKeyedResultCache::new(
        ReferenceZone::from_offset_minutes(0),
        Default::default(),
    );
    assert_eq!(utc_cache.key_for(&instant), date().pred_opt().unwrap());
}
