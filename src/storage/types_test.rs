use std::time::SystemTime;

use super::*;
use crate::Error;

fn composite_table(billing_mode: BillingMode) -> TableMetadata {
    TableMetadata {
        name: "item".into(),
        attribute_definitions: vec![
            AttributeDefinition::new("user_id", ScalarAttributeType::N),
            AttributeDefinition::new("item_id", ScalarAttributeType::N),
            AttributeDefinition::new("category", ScalarAttributeType::S),
        ],
        // range key listed first on purpose
        key_schema: vec![KeySchemaElement::range("item_id"), KeySchemaElement::hash("user_id")],
        size_bytes: 4096,
        item_count: 12,
        status: TableStatus::Active,
        created_at: SystemTime::now(),
        billing_mode,
        stream: Some(StreamSpecification {
            enabled: false,
            view_type: None,
        }),
        global_secondary_indexes: vec![GlobalSecondaryIndex {
            name: "by_category".into(),
            key_schema: vec![KeySchemaElement::hash("category")],
            projection: Projection::all(),
            provisioned_throughput: Some(ProvisionedThroughput {
                read_capacity_units: 5,
                write_capacity_units: 5,
            }),
        }],
        local_secondary_indexes: vec![LocalSecondaryIndex {
            name: "by_user_category".into(),
            key_schema: vec![KeySchemaElement::hash("user_id"), KeySchemaElement::range("category")],
            projection: Projection {
                projection_type: ProjectionType::Include,
                non_key_attributes: vec!["price".into()],
            },
        }],
    }
}

#[test]
fn key_attribute_names_lists_hash_key_first() {
    let meta = composite_table(BillingMode::PayPerRequest);

    assert_eq!(meta.key_attribute_names(), vec!["user_id".to_string(), "item_id".to_string()]);
}

#[test]
fn create_spec_keeps_schema_and_indexes() {
    let throughput = ProvisionedThroughput {
        read_capacity_units: 10,
        write_capacity_units: 20,
    };
    let meta = composite_table(BillingMode::Provisioned(throughput));

    let spec = meta.to_create_spec();

    assert_eq!(spec.name, "item");
    assert_eq!(spec.attribute_definitions, meta.attribute_definitions);
    assert_eq!(spec.key_schema, meta.key_schema);
    assert_eq!(spec.billing_mode, BillingMode::Provisioned(throughput));
    assert_eq!(spec.global_secondary_indexes, meta.global_secondary_indexes);
    // local indexes are carried over even when global ones exist
    assert_eq!(spec.local_secondary_indexes, meta.local_secondary_indexes);
    assert!(spec.validate().is_ok());
}

#[test]
fn create_spec_drops_index_throughput_for_on_demand_tables() {
    let spec = composite_table(BillingMode::PayPerRequest).to_create_spec();

    assert_eq!(spec.billing_mode, BillingMode::PayPerRequest);
    assert!(spec.global_secondary_indexes[0].provisioned_throughput.is_none());
}

#[test]
fn create_spec_skips_disabled_stream() {
    let mut meta = composite_table(BillingMode::PayPerRequest);
    assert!(meta.to_create_spec().stream.is_none());

    meta.stream = Some(StreamSpecification {
        enabled: true,
        view_type: Some(StreamViewType::NewAndOldImages),
    });
    assert_eq!(meta.to_create_spec().stream, meta.stream);
}

#[test]
fn create_spec_validation_rejects_missing_definition() {
    let mut spec = composite_table(BillingMode::PayPerRequest).to_create_spec();
    spec.attribute_definitions.retain(|d| d.name != "category");

    assert!(matches!(spec.validate(), Err(StorageError::InvalidSchema(_))));
}

#[test]
fn create_spec_validation_rejects_two_hash_keys() {
    let mut spec = composite_table(BillingMode::PayPerRequest).to_create_spec();
    spec.key_schema = vec![KeySchemaElement::hash("user_id"), KeySchemaElement::hash("item_id")];

    assert!(spec.validate().is_err());
}

#[test]
fn item_size_counts_names_and_values() {
    let mut item = Item::new();
    item.insert("id".into(), AttributeValue::N("1234".into()));
    item.insert("flag".into(), AttributeValue::Bool(true));

    assert_eq!(item_size_bytes(&item), 2 + 4 + 4 + 1);
}

#[test]
fn not_found_detection_sees_through_wrapping() {
    let err: Error = StorageError::TableNotFound("user".into()).into();
    assert!(err.is_table_not_found());

    let throttled: Error = StorageError::Throttled {
        table: "user".into(),
        message: "slow down".into(),
    }
    .into();
    assert!(!throttled.is_table_not_found());
}
