use std::sync::Arc;

use table_truncator::MemoryStorageClient;
use table_truncator::SegmentConfig;
use table_truncator::StorageClient;
use table_truncator::TruncateMode;
use table_truncator::Truncator;
use table_truncator::TruncatorConfig;
use tracing_test::traced_test;

use crate::common::seeded_hash_table;
use crate::common::ITEM_COUNT;

#[tokio::test]
#[traced_test]
async fn test_truncate_in_place_empties_the_table() {
    let client = Arc::new(MemoryStorageClient::new());
    seeded_hash_table(&client, "user", ITEM_COUNT).await;
    let created_at = client.describe_table("user").await.expect("describe").created_at;
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let errors = truncator.truncate(&["user"], TruncateMode::InPlace).await;

    assert!(errors.is_empty(), "unexpected failures: {:?}", errors);
    let after = client.describe_table("user").await.expect("table still exists");
    assert_eq!(after.item_count, 0);
    assert_eq!(after.created_at, created_at);
    assert!(client.max_batch_seen() <= 25);
}

#[tokio::test]
async fn test_truncate_in_place_across_many_segments() {
    let client = Arc::new(MemoryStorageClient::new().with_page_size(16));
    seeded_hash_table(&client, "user", ITEM_COUNT).await;
    let config = TruncatorConfig {
        segment: SegmentConfig {
            segment_size_bytes: 1024,
            batch_write_limit: 7,
            ..Default::default()
        },
        ..Default::default()
    };
    let truncator = Truncator::new(client.clone(), config);

    let report = truncator.truncate_in_place("user").await.expect("truncate");

    assert!(report.segments > 10);
    assert_eq!(report.deleted, ITEM_COUNT as u64);
    assert_eq!(client.item_count("user"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_truncate_in_place_survives_unprocessed_items() {
    let client = Arc::new(MemoryStorageClient::new());
    seeded_hash_table(&client, "user", ITEM_COUNT).await;
    client.inject_unprocessed(10, 30);
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let report = truncator.truncate_in_place("user").await.expect("truncate");

    assert_eq!(report.deleted, ITEM_COUNT as u64);
    assert_eq!(report.unprocessed_retries, 30);
    assert_eq!(client.item_count("user"), Some(0));
}

#[tokio::test]
#[traced_test]
async fn test_missing_table_does_not_stop_the_others() {
    let client = Arc::new(MemoryStorageClient::new());
    seeded_hash_table(&client, "present", 100).await;
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let errors = truncator.truncate(&["missing", "present"], TruncateMode::InPlace).await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].table, "missing");
    assert!(errors[0].source.is_table_not_found());
    assert_eq!(client.item_count("present"), Some(0));
}

#[tokio::test]
async fn test_empty_table_is_left_alone() {
    let client = Arc::new(MemoryStorageClient::new());
    seeded_hash_table(&client, "user", 0).await;
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let errors = truncator.truncate(&["user"], TruncateMode::InPlace).await;

    assert!(errors.is_empty());
    assert_eq!(client.batch_write_calls(), 0);
}
