//! Table, key and request shapes shared by every storage backend.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use serde::Deserialize;
use serde::Serialize;

use crate::Segment;
use crate::StorageError;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    /// Numbers travel as their decimal string form
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
}

impl AttributeValue {
    /// Approximate encoded size, used by backends that report table sizes.
    pub fn size_bytes(&self) -> u64 {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) => s.len() as u64,
            AttributeValue::B(b) => b.len() as u64,
            AttributeValue::Bool(_) | AttributeValue::Null => 1,
        }
    }

    pub fn scalar_type(&self) -> Option<ScalarAttributeType> {
        match self {
            AttributeValue::S(_) => Some(ScalarAttributeType::S),
            AttributeValue::N(_) => Some(ScalarAttributeType::N),
            AttributeValue::B(_) => Some(ScalarAttributeType::B),
            _ => None,
        }
    }
}

/// Attribute name to value
pub type Item = BTreeMap<String, AttributeValue>;

/// An item projected down to its primary key attributes
pub type Key = Item;

/// Sum of attribute name and value sizes
pub fn item_size_bytes(item: &Item) -> u64 {
    item.iter().map(|(name, value)| name.len() as u64 + value.size_bytes()).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarAttributeType {
    S,
    N,
    B,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub attribute_type: ScalarAttributeType,
}

impl AttributeDefinition {
    pub fn new(
        name: impl Into<String>,
        attribute_type: ScalarAttributeType,
    ) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// Partition key
    Hash,
    /// Sort key
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchemaElement {
    pub name: String,
    pub key_type: KeyType,
}

impl KeySchemaElement {
    pub fn hash(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: KeyType::Hash,
        }
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: KeyType::Range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedThroughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

/// Throughput mode of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingMode {
    Provisioned(ProvisionedThroughput),
    PayPerRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionType {
    All,
    KeysOnly,
    Include,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub projection_type: ProjectionType,
    /// Only meaningful with [`ProjectionType::Include`]
    pub non_key_attributes: Vec<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self {
            projection_type: ProjectionType::All,
            non_key_attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSecondaryIndex {
    pub name: String,
    pub key_schema: Vec<KeySchemaElement>,
    pub projection: Projection,
    /// Absent for pay-per-request tables
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSecondaryIndex {
    pub name: String,
    pub key_schema: Vec<KeySchemaElement>,
    pub projection: Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamViewType {
    KeysOnly,
    NewImage,
    OldImage,
    NewAndOldImages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpecification {
    pub enabled: bool,
    pub view_type: Option<StreamViewType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

/// Snapshot of a table as returned by describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub size_bytes: u64,
    pub item_count: u64,
    pub status: TableStatus,
    pub created_at: SystemTime,
    pub billing_mode: BillingMode,
    pub stream: Option<StreamSpecification>,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
}

impl TableMetadata {
    /// Names of the primary key attributes, hash key first.
    pub fn key_attribute_names(&self) -> Vec<String> {
        let mut keys: Vec<&KeySchemaElement> = self.key_schema.iter().collect();
        keys.sort_by_key(|k| k.key_type == KeyType::Range);
        keys.into_iter().map(|k| k.name.clone()).collect()
    }

    /// Everything needed to rebuild this table, empty and schema-identical.
    pub fn to_create_spec(&self) -> CreateTableSpec {
        let provisioned = matches!(self.billing_mode, BillingMode::Provisioned(_));
        CreateTableSpec {
            name: self.name.clone(),
            attribute_definitions: self.attribute_definitions.clone(),
            key_schema: self.key_schema.clone(),
            billing_mode: self.billing_mode,
            stream: self.stream.filter(|s| s.enabled),
            global_secondary_indexes: self
                .global_secondary_indexes
                .iter()
                .map(|gsi| GlobalSecondaryIndex {
                    provisioned_throughput: if provisioned {
                        gsi.provisioned_throughput
                    } else {
                        None
                    },
                    ..gsi.clone()
                })
                .collect(),
            local_secondary_indexes: self.local_secondary_indexes.clone(),
        }
    }
}

/// Input of a create-table call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableSpec {
    pub name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub billing_mode: BillingMode,
    pub stream: Option<StreamSpecification>,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
}

impl CreateTableSpec {
    /// Rejects specs the service would refuse: a missing or duplicated hash
    /// key, more than one range key, or key attributes without a definition.
    pub fn validate(&self) -> Result<(), StorageError> {
        let hash_keys = self.key_schema.iter().filter(|k| k.key_type == KeyType::Hash).count();
        let range_keys = self.key_schema.iter().filter(|k| k.key_type == KeyType::Range).count();
        if hash_keys != 1 || range_keys > 1 {
            return Err(StorageError::InvalidSchema(format!(
                "table '{}' needs exactly one hash key and at most one range key",
                self.name
            )));
        }

        let indexed = self
            .global_secondary_indexes
            .iter()
            .flat_map(|gsi| gsi.key_schema.iter())
            .chain(self.local_secondary_indexes.iter().flat_map(|lsi| lsi.key_schema.iter()));
        for key in self.key_schema.iter().chain(indexed) {
            if !self.attribute_definitions.iter().any(|d| d.name == key.name) {
                return Err(StorageError::InvalidSchema(format!(
                    "key attribute '{}' of table '{}' has no attribute definition",
                    key.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Put(Item),
    Delete(Key),
}

/// A page request against one segment of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub table: String,
    /// Attributes to project; the primary key is all a delete needs
    pub attributes: Vec<String>,
    pub segment: Segment,
    /// Resumption cursor, `None` at the start of the segment
    pub exclusive_start_key: Option<Key>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Continuation marker; `None` once the segment is exhausted
    pub last_evaluated_key: Option<Key>,
}

impl fmt::Display for TableStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Active => "ACTIVE",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
        };
        f.write_str(s)
    }
}
