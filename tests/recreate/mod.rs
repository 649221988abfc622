use std::sync::Arc;
use std::time::Duration;

use table_truncator::AttributeDefinition;
use table_truncator::BillingMode;
use table_truncator::GlobalSecondaryIndex;
use table_truncator::KeySchemaElement;
use table_truncator::LocalSecondaryIndex;
use table_truncator::MemoryStorageClient;
use table_truncator::Projection;
use table_truncator::ProjectionType;
use table_truncator::ProvisionedThroughput;
use table_truncator::ScalarAttributeType;
use table_truncator::StorageClient;
use table_truncator::StreamSpecification;
use table_truncator::StreamViewType;
use table_truncator::TruncateMode;
use table_truncator::Truncator;
use table_truncator::TruncatorConfig;
use table_truncator::WaiterPolicy;
use tracing_test::traced_test;

use crate::common::composite_key_table;
use crate::common::random_composite_items;
use crate::common::seeded_composite_table;
use crate::common::seeded_hash_table;
use crate::common::ITEM_COUNT;

#[tokio::test]
#[traced_test]
async fn test_recreate_empties_a_composite_key_table() {
    let client = Arc::new(MemoryStorageClient::new());
    seeded_composite_table(&client, "item", BillingMode::PayPerRequest, ITEM_COUNT).await;
    let before = client.describe_table("item").await.expect("describe");
    assert_eq!(before.item_count, ITEM_COUNT as u64);
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let errors = truncator.truncate(&["item"], TruncateMode::Recreate).await;

    assert!(errors.is_empty(), "unexpected failures: {:?}", errors);
    let after = client.describe_table("item").await.expect("describe");
    assert_eq!(after.item_count, 0);
    assert!(after.created_at > before.created_at);
    assert_eq!(after.to_create_spec(), before.to_create_spec());
    assert_eq!(after.billing_mode, BillingMode::PayPerRequest);
}

#[tokio::test(start_paused = true)]
async fn test_recreate_preserves_indexes_streams_and_throughput() {
    let client = Arc::new(MemoryStorageClient::new().with_lifecycle_delay(Duration::from_millis(500)));
    let throughput = ProvisionedThroughput {
        read_capacity_units: 3,
        write_capacity_units: 4,
    };
    let mut spec = composite_key_table("item", BillingMode::Provisioned(throughput));
    spec.attribute_definitions
        .push(AttributeDefinition::new("category", ScalarAttributeType::S));
    spec.stream = Some(StreamSpecification {
        enabled: true,
        view_type: Some(StreamViewType::NewAndOldImages),
    });
    spec.global_secondary_indexes.push(GlobalSecondaryIndex {
        name: "by_category".to_string(),
        key_schema: vec![KeySchemaElement::hash("category")],
        projection: Projection::all(),
        provisioned_throughput: Some(ProvisionedThroughput {
            read_capacity_units: 1,
            write_capacity_units: 2,
        }),
    });
    spec.local_secondary_indexes.push(LocalSecondaryIndex {
        name: "by_user_category".to_string(),
        key_schema: vec![KeySchemaElement::hash("user_id"), KeySchemaElement::range("category")],
        projection: Projection {
            projection_type: ProjectionType::KeysOnly,
            non_key_attributes: Vec::new(),
        },
    });
    client.create_table(spec.clone()).await.expect("create");
    client
        .await_exists("item", &WaiterPolicy::default())
        .await
        .expect("active");
    client
        .put_items("item", random_composite_items(200))
        .await
        .expect("seed");
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let errors = truncator.truncate(&["item"], TruncateMode::Recreate).await;

    assert!(errors.is_empty(), "unexpected failures: {:?}", errors);
    let after = client.describe_table("item").await.expect("describe");
    assert_eq!(after.item_count, 0);
    assert_eq!(after.to_create_spec(), spec);
}

#[tokio::test]
async fn test_recreate_failures_are_reported_per_table() {
    let client = Arc::new(MemoryStorageClient::new());
    seeded_hash_table(&client, "user", 100).await;
    let truncator = Truncator::new(client.clone(), TruncatorConfig::default());

    let errors = truncator.truncate(&["user", "missing"], TruncateMode::Recreate).await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].table, "missing");
    assert!(errors[0].source.is_table_not_found());
    assert_eq!(client.item_count("user"), Some(0));
}
