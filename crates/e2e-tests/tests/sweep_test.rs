//! Sweep E2E tests: mocked catalog API through to the on-disk vector store.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{movie, movies, TestHarness, COLLECTION};
use ingest_vector::VectorStore;

/// 150 valid records on page 1 and an empty page 2 flush as 100 then 50.
#[tokio::test]
async fn test_two_page_sweep_flushes_threshold_then_remainder() {
    let harness = TestHarness::new().await;
    harness.mount_page(1, movies(1..151), None).await;
    harness.mount_page(2, vec![], None).await;

    let report = harness
        .controller(harness.sweep_config(2, 100))
        .run()
        .await
        .unwrap();

    assert_eq!(harness.store.upsert_sizes(), vec![100, 50]);
    assert_eq!(report.total_added, 150);
    assert_eq!(report.failed_pages, BTreeSet::new());
    assert_eq!(harness.store.count(COLLECTION).await.unwrap(), 150);
}

/// A page failing every attempt is recorded and the sweep continues.
#[tokio::test]
async fn test_failed_page_is_skipped_after_retries() {
    let harness = TestHarness::new().await;
    harness.mount_page(1, movies(100..110), None).await;
    harness.mount_page(2, movies(200..210), None).await;
    harness.mount_status(3, 503).await;
    harness.mount_page(4, movies(400..410), None).await;
    harness.mount_page(5, movies(500..510), None).await;

    let report = harness
        .controller(harness.sweep_config(5, 100))
        .run()
        .await
        .unwrap();

    assert_eq!(report.failed_pages, BTreeSet::from([3]));
    assert_eq!(report.total_added, 40);
    assert_eq!(report.pages_fetched, 4);
    assert_eq!(harness.requests_for_page(3).await, 5);
    for page in [1, 2, 4, 5] {
        assert_eq!(harness.requests_for_page(page).await, 1, "page {page}");
    }
    assert_eq!(harness.store.count(COLLECTION).await.unwrap(), 40);
}

/// Non-retryable statuses fail the page on the first attempt.
#[tokio::test]
async fn test_not_found_page_is_not_retried() {
    let harness = TestHarness::new().await;
    harness.mount_page(1, movies(1..4), None).await;
    harness.mount_status(2, 404).await;

    let report = harness
        .controller(harness.sweep_config(2, 100))
        .run()
        .await
        .unwrap();

    assert_eq!(report.failed_pages, BTreeSet::from([2]));
    assert_eq!(harness.requests_for_page(2).await, 1);
    assert_eq!(report.total_added, 3);
}

/// Records without a synopsis and malformed entries never reach the index.
#[tokio::test]
async fn test_unusable_records_are_not_indexed() {
    let harness = TestHarness::new().await;
    let mut results = movies(1..4);
    results.push(json!({"id": 50, "title": "No synopsis", "overview": ""}));
    results.push(json!({"id": 51, "title": "Null synopsis", "overview": null}));
    results.push(json!({"title": "No id at all", "overview": "Orphan"}));
    harness.mount_page(1, results, None).await;

    let report = harness
        .controller(harness.sweep_config(1, 100))
        .run()
        .await
        .unwrap();

    assert_eq!(report.total_added, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.malformed, 1);
    assert!(harness.store.get_point(COLLECTION, 50).await.unwrap().is_none());
    assert!(harness.store.get_point(COLLECTION, 51).await.unwrap().is_none());
}

/// Points carry the catalog metadata, with defaults for missing fields.
#[tokio::test]
async fn test_payload_written_with_defaults() {
    let harness = TestHarness::new().await;
    harness
        .mount_page(
            1,
            vec![
                movie(7),
                json!({"id": 8, "title": "Sparse", "overview": "Only the basics."}),
            ],
            None,
        )
        .await;

    harness
        .controller(harness.sweep_config(1, 100))
        .run()
        .await
        .unwrap();

    let full = harness
        .store
        .get_point(COLLECTION, 7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(full.payload["title"], "Movie 7");
    assert_eq!(full.payload["poster_path"], "/poster-7.jpg");
    assert_eq!(full.payload["release_date"], "1999-03-31");
    assert_eq!(full.payload["vote_average"], 7.9);

    let sparse = harness
        .store
        .get_point(COLLECTION, 8)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sparse.payload["poster_path"], "");
    assert_eq!(sparse.payload["release_date"], "Unknown");
    assert_eq!(sparse.payload["vote_average"], 0.0);
}

/// Re-running the same sweep overwrites points instead of duplicating them.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let harness = TestHarness::new().await;
    harness.mount_page(1, movies(1..31), None).await;

    for _ in 0..2 {
        harness
            .controller(harness.sweep_config(1, 10))
            .run()
            .await
            .unwrap();
    }

    assert_eq!(harness.store.upsert_sizes(), vec![10, 10, 10, 10, 10, 10]);
    assert_eq!(harness.store.count(COLLECTION).await.unwrap(), 30);
}

/// The sweep stops at the last page the catalog reports.
#[tokio::test]
async fn test_total_pages_ends_sweep() {
    let harness = TestHarness::new().await;
    harness.mount_page(1, movies(1..6), Some(2)).await;
    harness.mount_page(2, movies(6..9), Some(2)).await;

    let report = harness
        .controller(harness.sweep_config(500, 100))
        .run()
        .await
        .unwrap();

    assert_eq!(report.last_page, 2);
    assert_eq!(report.total_added, 8);
    assert_eq!(harness.requests_for_page(3).await, 0);
}
