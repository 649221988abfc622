//! Table fixtures shared by unit tests
use crate::AttributeDefinition;
use crate::AttributeValue;
use crate::BillingMode;
use crate::CreateTableSpec;
use crate::Item;
use crate::KeySchemaElement;
use crate::MemoryStorageClient;
use crate::Result;
use crate::ScalarAttributeType;
use crate::StorageClient;

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

/// `count` items for [`hash_key_table`], ids `0` to `count - 1`.
pub fn numbered_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| {
            Item::from([
                ("id".to_string(), AttributeValue::N(i.to_string())),
                ("payload".to_string(), AttributeValue::S("x".repeat(16))),
            ])
        })
        .collect()
}

/// One item for [`composite_key_table`].
pub fn composite_item(
    user_id: u64,
    item_id: u64,
) -> Item {
    Item::from([
        ("user_id".to_string(), AttributeValue::N(user_id.to_string())),
        ("item_id".to_string(), AttributeValue::N(item_id.to_string())),
    ])
}

/// Create `spec` on `client` and fill it with `items`.
pub async fn seed_table(
    client: &MemoryStorageClient,
    spec: CreateTableSpec,
    items: Vec<Item>,
) -> Result<()> {
    let name = spec.name.clone();
    client.create_table(spec).await?;
    client.put_items(&name, items).await
}
