use std::sync::Arc;

use rand::Rng;
use table_truncator::AttributeDefinition;
use table_truncator::AttributeValue;
use table_truncator::BillingMode;
use table_truncator::CreateTableSpec;
use table_truncator::Item;
use table_truncator::KeySchemaElement;
use table_truncator::MemoryStorageClient;
use table_truncator::ScalarAttributeType;
use table_truncator::StorageClient;

pub const ITEM_COUNT: usize = 1000;

/// Table keyed by a single numeric attribute `id`.
pub fn hash_key_table(name: &str) -> CreateTableSpec {
    CreateTableSpec {
        name: name.to_string(),
        attribute_definitions: vec![AttributeDefinition::new("id", ScalarAttributeType::N)],
        key_schema: vec![KeySchemaElement::hash("id")],
        billing_mode: BillingMode::PayPerRequest,
        stream: None,
        global_secondary_indexes: Vec::new(),
        local_secondary_indexes: Vec::new(),
    }
}

/// Table keyed by numeric `user_id` (hash) and `item_id` (range).
pub fn composite_key_table(
    name: &str,
    billing_mode: BillingMode,
) -> CreateTableSpec {
    CreateTableSpec {
        name: name.to_string(),
        attribute_definitions: vec![
            AttributeDefinition::new("user_id", ScalarAttributeType::N),
            AttributeDefinition::new("item_id", ScalarAttributeType::N),
        ],
        key_schema: vec![KeySchemaElement::hash("user_id"), KeySchemaElement::range("item_id")],
        billing_mode,
        stream: None,
        global_secondary_indexes: Vec::new(),
        local_secondary_indexes: Vec::new(),
    }
}

async fn seed_table(
    client: &MemoryStorageClient,
    spec: CreateTableSpec,
    items: Vec<Item>,
) {
    let name = spec.name.clone();
    client.create_table(spec).await.expect("create table");
    client.put_items(&name, items).await.expect("seed items");
}

/// `count` items with ids `0` to `count - 1` in a table called `name`.
pub async fn seeded_hash_table(
    client: &Arc<MemoryStorageClient>,
    name: &str,
    count: usize,
) {
    let items = (0..count)
        .map(|i| {
            Item::from([
                ("id".to_string(), AttributeValue::N(i.to_string())),
                ("payload".to_string(), AttributeValue::S("x".repeat(16))),
            ])
        })
        .collect();
    seed_table(client, hash_key_table(name), items).await;
}

/// One item per user with a random sort key in `0..10`.
pub fn random_composite_items(count: usize) -> Vec<Item> {
    let mut rng = rand::thread_rng();
    (0..count as u64)
        .map(|user_id| {
            Item::from([
                ("user_id".to_string(), AttributeValue::N(user_id.to_string())),
                ("item_id".to_string(), AttributeValue::N(rng.gen_range(0..10u64).to_string())),
            ])
        })
        .collect()
}

pub async fn seeded_composite_table(
    client: &Arc<MemoryStorageClient>,
    name: &str,
    billing_mode: BillingMode,
    count: usize,
) {
    seed_table(
        client,
        composite_key_table(name, billing_mode),
        random_composite_items(count),
    )
    .await;
}
