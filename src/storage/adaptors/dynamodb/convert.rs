//! Mapping between the engine's table shapes and the SDK's.
use std::collections::HashMap;
use std::time::SystemTime;

use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types as sdk;

use crate::AttributeDefinition;
use crate::AttributeValue;
use crate::BillingMode;
use crate::GlobalSecondaryIndex;
use crate::Item;
use crate::KeySchemaElement;
use crate::KeyType;
use crate::LocalSecondaryIndex;
use crate::Projection;
use crate::ProjectionType;
use crate::ProvisionedThroughput;
use crate::ScalarAttributeType;
use crate::StorageError;
use crate::StreamSpecification;
use crate::StreamViewType;
use crate::TableMetadata;
use crate::TableStatus;
use crate::WriteRequest;

type ConvertResult<T> = std::result::Result<T, StorageError>;

fn build_error(e: BuildError) -> StorageError {
    StorageError::InvalidRequest(e.to_string())
}

pub(crate) fn to_sdk_value(value: &AttributeValue) -> sdk::AttributeValue {
    match value {
        AttributeValue::S(s) => sdk::AttributeValue::S(s.clone()),
        AttributeValue::N(n) => sdk::AttributeValue::N(n.clone()),
        AttributeValue::B(b) => sdk::AttributeValue::B(Blob::new(b.clone())),
        AttributeValue::Bool(b) => sdk::AttributeValue::Bool(*b),
        AttributeValue::Null => sdk::AttributeValue::Null(true),
    }
}

pub(crate) fn from_sdk_value(
    name: &str,
    value: &sdk::AttributeValue,
) -> ConvertResult<AttributeValue> {
    match value {
        sdk::AttributeValue::S(s) => Ok(AttributeValue::S(s.clone())),
        sdk::AttributeValue::N(n) => Ok(AttributeValue::N(n.clone())),
        sdk::AttributeValue::B(b) => Ok(AttributeValue::B(b.as_ref().to_vec())),
        sdk::AttributeValue::Bool(b) => Ok(AttributeValue::Bool(*b)),
        sdk::AttributeValue::Null(_) => Ok(AttributeValue::Null),
        other => Err(StorageError::InvalidSchema(format!(
            "attribute '{}' has an unsupported type: {:?}",
            name, other
        ))),
    }
}

pub(crate) fn to_sdk_item(item: &Item) -> HashMap<String, sdk::AttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk_value(value)))
        .collect()
}

pub(crate) fn from_sdk_item(item: &HashMap<String, sdk::AttributeValue>) -> ConvertResult<Item> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), from_sdk_value(name, value)?)))
        .collect()
}

pub(crate) fn to_sdk_write(request: &WriteRequest) -> ConvertResult<sdk::WriteRequest> {
    let write = match request {
        WriteRequest::Put(item) => sdk::WriteRequest::builder()
            .put_request(
                sdk::PutRequest::builder()
                    .set_item(Some(to_sdk_item(item)))
                    .build()
                    .map_err(build_error)?,
            )
            .build(),
        WriteRequest::Delete(key) => sdk::WriteRequest::builder()
            .delete_request(
                sdk::DeleteRequest::builder()
                    .set_key(Some(to_sdk_item(key)))
                    .build()
                    .map_err(build_error)?,
            )
            .build(),
    };
    Ok(write)
}

pub(crate) fn from_sdk_write(request: &sdk::WriteRequest) -> ConvertResult<WriteRequest> {
    if let Some(delete) = request.delete_request() {
        return Ok(WriteRequest::Delete(from_sdk_item(delete.key())?));
    }
    if let Some(put) = request.put_request() {
        return Ok(WriteRequest::Put(from_sdk_item(put.item())?));
    }
    Err(StorageError::InvalidRequest(
        "unprocessed write request is neither a put nor a delete".to_string(),
    ))
}

fn scalar_type(t: &sdk::ScalarAttributeType) -> ConvertResult<ScalarAttributeType> {
    match t {
        sdk::ScalarAttributeType::S => Ok(ScalarAttributeType::S),
        sdk::ScalarAttributeType::N => Ok(ScalarAttributeType::N),
        sdk::ScalarAttributeType::B => Ok(ScalarAttributeType::B),
        other => Err(StorageError::InvalidSchema(format!(
            "unknown attribute type {:?}",
            other
        ))),
    }
}

fn sdk_scalar_type(t: ScalarAttributeType) -> sdk::ScalarAttributeType {
    match t {
        ScalarAttributeType::S => sdk::ScalarAttributeType::S,
        ScalarAttributeType::N => sdk::ScalarAttributeType::N,
        ScalarAttributeType::B => sdk::ScalarAttributeType::B,
    }
}

fn key_schema(elements: &[sdk::KeySchemaElement]) -> ConvertResult<Vec<KeySchemaElement>> {
    elements
        .iter()
        .map(|k| {
            let key_type = match k.key_type() {
                sdk::KeyType::Hash => KeyType::Hash,
                sdk::KeyType::Range => KeyType::Range,
                other => {
                    return Err(StorageError::InvalidSchema(format!(
                        "unknown key type {:?}",
                        other
                    )))
                }
            };
            Ok(KeySchemaElement {
                name: k.attribute_name().to_string(),
                key_type,
            })
        })
        .collect()
}

pub(crate) fn sdk_key_schema(elements: &[KeySchemaElement]) -> ConvertResult<Vec<sdk::KeySchemaElement>> {
    elements
        .iter()
        .map(|k| {
            let key_type = match k.key_type {
                KeyType::Hash => sdk::KeyType::Hash,
                KeyType::Range => sdk::KeyType::Range,
            };
            sdk::KeySchemaElement::builder()
                .attribute_name(&k.name)
                .key_type(key_type)
                .build()
                .map_err(build_error)
        })
        .collect()
}

fn projection(p: Option<&sdk::Projection>) -> Projection {
    let Some(p) = p else {
        return Projection::all();
    };
    let projection_type = match p.projection_type() {
        Some(sdk::ProjectionType::KeysOnly) => ProjectionType::KeysOnly,
        Some(sdk::ProjectionType::Include) => ProjectionType::Include,
        _ => ProjectionType::All,
    };
    Projection {
        projection_type,
        non_key_attributes: p.non_key_attributes().to_vec(),
    }
}

fn sdk_projection(p: &Projection) -> sdk::Projection {
    let projection_type = match p.projection_type {
        ProjectionType::All => sdk::ProjectionType::All,
        ProjectionType::KeysOnly => sdk::ProjectionType::KeysOnly,
        ProjectionType::Include => sdk::ProjectionType::Include,
    };
    let non_key_attributes = if p.non_key_attributes.is_empty() {
        None
    } else {
        Some(p.non_key_attributes.clone())
    };
    sdk::Projection::builder()
        .projection_type(projection_type)
        .set_non_key_attributes(non_key_attributes)
        .build()
}

fn throughput(t: Option<&sdk::ProvisionedThroughputDescription>) -> Option<ProvisionedThroughput> {
    let t = t?;
    Some(ProvisionedThroughput {
        read_capacity_units: t.read_capacity_units()?,
        write_capacity_units: t.write_capacity_units()?,
    })
}

pub(crate) fn sdk_throughput(t: &ProvisionedThroughput) -> ConvertResult<sdk::ProvisionedThroughput> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(t.read_capacity_units)
        .write_capacity_units(t.write_capacity_units)
        .build()
        .map_err(build_error)
}

fn stream_view_type(v: &sdk::StreamViewType) -> Option<StreamViewType> {
    match v {
        sdk::StreamViewType::KeysOnly => Some(StreamViewType::KeysOnly),
        sdk::StreamViewType::NewImage => Some(StreamViewType::NewImage),
        sdk::StreamViewType::OldImage => Some(StreamViewType::OldImage),
        sdk::StreamViewType::NewAndOldImages => Some(StreamViewType::NewAndOldImages),
        _ => None,
    }
}

fn sdk_stream_view_type(v: StreamViewType) -> sdk::StreamViewType {
    match v {
        StreamViewType::KeysOnly => sdk::StreamViewType::KeysOnly,
        StreamViewType::NewImage => sdk::StreamViewType::NewImage,
        StreamViewType::OldImage => sdk::StreamViewType::OldImage,
        StreamViewType::NewAndOldImages => sdk::StreamViewType::NewAndOldImages,
    }
}

fn table_status(s: Option<&sdk::TableStatus>) -> TableStatus {
    match s {
        Some(sdk::TableStatus::Active) => TableStatus::Active,
        Some(sdk::TableStatus::Creating) => TableStatus::Creating,
        Some(sdk::TableStatus::Deleting) => TableStatus::Deleting,
        _ => TableStatus::Updating,
    }
}

/// Flatten a describe response into [`TableMetadata`].
pub(crate) fn table_metadata(t: &sdk::TableDescription) -> ConvertResult<TableMetadata> {
    let name = t
        .table_name()
        .ok_or_else(|| StorageError::InvalidSchema("table description without a name".to_string()))?
        .to_string();

    let attribute_definitions = t
        .attribute_definitions()
        .iter()
        .map(|d| {
            Ok(AttributeDefinition::new(
                d.attribute_name(),
                scalar_type(d.attribute_type())?,
            ))
        })
        .collect::<ConvertResult<Vec<_>>>()?;

    let on_demand = t
        .billing_mode_summary()
        .and_then(|s| s.billing_mode())
        .is_some_and(|m| *m == sdk::BillingMode::PayPerRequest);
    let billing_mode = if on_demand {
        BillingMode::PayPerRequest
    } else {
        let throughput = throughput(t.provisioned_throughput()).ok_or_else(|| {
            StorageError::InvalidSchema(format!("provisioned table '{}' reports no throughput", name))
        })?;
        BillingMode::Provisioned(throughput)
    };

    let stream = t.stream_specification().map(|s| StreamSpecification {
        enabled: s.stream_enabled(),
        view_type: s.stream_view_type().and_then(stream_view_type),
    });

    let global_secondary_indexes = t
        .global_secondary_indexes()
        .iter()
        .map(|gsi| {
            Ok(GlobalSecondaryIndex {
                name: gsi.index_name().unwrap_or_default().to_string(),
                key_schema: key_schema(gsi.key_schema())?,
                projection: projection(gsi.projection()),
                provisioned_throughput: throughput(gsi.provisioned_throughput()),
            })
        })
        .collect::<ConvertResult<Vec<_>>>()?;

    let local_secondary_indexes = t
        .local_secondary_indexes()
        .iter()
        .map(|lsi| {
            Ok(LocalSecondaryIndex {
                name: lsi.index_name().unwrap_or_default().to_string(),
                key_schema: key_schema(lsi.key_schema())?,
                projection: projection(lsi.projection()),
            })
        })
        .collect::<ConvertResult<Vec<_>>>()?;

    Ok(TableMetadata {
        attribute_definitions,
        key_schema: key_schema(t.key_schema())?,
        size_bytes: t.table_size_bytes().unwrap_or(0).max(0) as u64,
        item_count: t.item_count().unwrap_or(0).max(0) as u64,
        status: table_status(t.table_status()),
        created_at: t
            .creation_date_time()
            .and_then(|d| SystemTime::try_from(*d).ok())
            .unwrap_or(SystemTime::UNIX_EPOCH),
        billing_mode,
        stream,
        global_secondary_indexes,
        local_secondary_indexes,
        name,
    })
}

pub(crate) fn sdk_attribute_definitions(
    definitions: &[AttributeDefinition],
) -> ConvertResult<Vec<sdk::AttributeDefinition>> {
    definitions
        .iter()
        .map(|d| {
            sdk::AttributeDefinition::builder()
                .attribute_name(&d.name)
                .attribute_type(sdk_scalar_type(d.attribute_type))
                .build()
                .map_err(build_error)
        })
        .collect()
}

pub(crate) fn sdk_stream_specification(
    s: &StreamSpecification,
) -> ConvertResult<sdk::StreamSpecification> {
    sdk::StreamSpecification::builder()
        .stream_enabled(s.enabled)
        .set_stream_view_type(s.view_type.map(sdk_stream_view_type))
        .build()
        .map_err(build_error)
}

pub(crate) fn sdk_global_secondary_index(
    gsi: &GlobalSecondaryIndex,
) -> ConvertResult<sdk::GlobalSecondaryIndex> {
    let provisioned_throughput = gsi.provisioned_throughput.as_ref().map(sdk_throughput).transpose()?;
    sdk::GlobalSecondaryIndex::builder()
        .index_name(&gsi.name)
        .set_key_schema(Some(sdk_key_schema(&gsi.key_schema)?))
        .projection(sdk_projection(&gsi.projection))
        .set_provisioned_throughput(provisioned_throughput)
        .build()
        .map_err(build_error)
}

pub(crate) fn sdk_local_secondary_index(
    lsi: &LocalSecondaryIndex,
) -> ConvertResult<sdk::LocalSecondaryIndex> {
    sdk::LocalSecondaryIndex::builder()
        .index_name(&lsi.name)
        .set_key_schema(Some(sdk_key_schema(&lsi.key_schema)?))
        .projection(sdk_projection(&lsi.projection))
        .build()
        .map_err(build_error)
}
