use std::error::Error as StdError;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::error::ProvideErrorMetadata;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types as sdk;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use super::convert::from_sdk_item;
use super::convert::from_sdk_write;
use super::convert::sdk_attribute_definitions;
use super::convert::sdk_global_secondary_index;
use super::convert::sdk_key_schema;
use super::convert::sdk_local_secondary_index;
use super::convert::sdk_stream_specification;
use super::convert::sdk_throughput;
use super::convert::table_metadata;
use super::convert::to_sdk_item;
use super::convert::to_sdk_write;
use crate::BillingMode;
use crate::ConnectionConfig;
use crate::CreateTableSpec;
use crate::Result;
use crate::ScanPage;
use crate::ScanRequest;
use crate::StorageClient;
use crate::StorageError;
use crate::TableMetadata;
use crate::WriteRequest;

const CREDENTIALS_PROVIDER_NAME: &str = "truncator";

/// [`StorageClient`] backed by Amazon DynamoDB (or any endpoint speaking
/// its API).
#[derive(Clone)]
pub struct DynamoDbStorageClient {
    client: Client,
}

impl Debug for DynamoDbStorageClient {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DynamoDbStorageClient").finish_non_exhaustive()
    }
}

impl DynamoDbStorageClient {
    /// Build a client from the shared SDK configuration chain, with the
    /// region, profile, static credentials and endpoint of `config` applied
    /// on top.
    pub async fn connect(config: &ConnectionConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some((access_key_id, secret_access_key)) = config.static_credentials() {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        debug!("connecting to dynamodb: {:?}", config);

        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Wrap a pre-built client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn sdk_error<E, R>(
    operation: &'static str,
    table: &str,
    err: SdkError<E, R>,
) -> StorageError
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    let code = err.code().map(str::to_owned);
    match code.as_deref() {
        Some("ResourceNotFoundException") => StorageError::TableNotFound(table.to_string()),
        Some("ProvisionedThroughputExceededException" | "ThrottlingException" | "RequestLimitExceeded") => {
            StorageError::Throttled {
                table: table.to_string(),
                message: err.message().unwrap_or_default().to_string(),
            }
        }
        _ => StorageError::Service {
            operation,
            table: table.to_string(),
            source: DisplayErrorContext(&err).to_string().into(),
        },
    }
}

fn segment_param(
    value: u32,
    what: &str,
) -> std::result::Result<i32, StorageError> {
    i32::try_from(value).map_err(|_| StorageError::InvalidRequest(format!("{} {} is out of range", what, value)))
}

#[async_trait]
impl StorageClient for DynamoDbStorageClient {
    async fn describe_table(
        &self,
        table: &str,
    ) -> Result<TableMetadata> {
        let output = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeTable", table, e))?;

        let description = output
            .table()
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        Ok(table_metadata(description)?)
    }

    async fn scan_segment(
        &self,
        request: ScanRequest,
    ) -> Result<ScanPage> {
        let mut scan = self
            .client
            .scan()
            .table_name(&request.table)
            .segment(segment_param(request.segment.index(), "segment")?)
            .total_segments(segment_param(request.segment.total(), "total segments")?)
            .set_exclusive_start_key(request.exclusive_start_key.as_ref().map(to_sdk_item))
            .set_limit(request.limit.map(|l| l.min(i32::MAX as u32) as i32));

        // placeholders keep reserved words usable as key names
        if !request.attributes.is_empty() {
            let placeholders: Vec<String> = (0..request.attributes.len()).map(|i| format!("#k{}", i)).collect();
            scan = scan.projection_expression(placeholders.join(", "));
            for (placeholder, name) in placeholders.into_iter().zip(request.attributes.iter()) {
                scan = scan.expression_attribute_names(placeholder, name);
            }
        }

        let output = scan.send().await.map_err(|e| sdk_error("Scan", &request.table, e))?;

        let items = output
            .items()
            .iter()
            .map(from_sdk_item)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let last_evaluated_key = output.last_evaluated_key().map(from_sdk_item).transpose()?;
        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>> {
        let writes = requests
            .iter()
            .map(to_sdk_write)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, writes)
            .send()
            .await
            .map_err(|e| sdk_error("BatchWriteItem", table, e))?;

        let unprocessed = output
            .unprocessed_items()
            .and_then(|by_table| by_table.get(table))
            .map(|writes| {
                writes
                    .iter()
                    .map(from_sdk_write)
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(unprocessed)
    }

    async fn delete_table(
        &self,
        table: &str,
    ) -> Result<()> {
        self.client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteTable", table, e))?;
        Ok(())
    }

    async fn create_table(
        &self,
        spec: CreateTableSpec,
    ) -> Result<()> {
        spec.validate()?;

        let mut create = self
            .client
            .create_table()
            .table_name(&spec.name)
            .set_attribute_definitions(Some(sdk_attribute_definitions(&spec.attribute_definitions)?))
            .set_key_schema(Some(sdk_key_schema(&spec.key_schema)?));

        create = match &spec.billing_mode {
            BillingMode::PayPerRequest => create.billing_mode(sdk::BillingMode::PayPerRequest),
            BillingMode::Provisioned(throughput) => create
                .billing_mode(sdk::BillingMode::Provisioned)
                .provisioned_throughput(sdk_throughput(throughput)?),
        };

        if let Some(stream) = &spec.stream {
            create = create.stream_specification(sdk_stream_specification(stream)?);
        }
        // the service rejects empty index lists
        if !spec.global_secondary_indexes.is_empty() {
            let indexes = spec
                .global_secondary_indexes
                .iter()
                .map(sdk_global_secondary_index)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            create = create.set_global_secondary_indexes(Some(indexes));
        }
        if !spec.local_secondary_indexes.is_empty() {
            let indexes = spec
                .local_secondary_indexes
                .iter()
                .map(sdk_local_secondary_index)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            create = create.set_local_secondary_indexes(Some(indexes));
        }

        create
            .send()
            .await
            .map_err(|e| sdk_error("CreateTable", &spec.name, e))?;
        Ok(())
    }
}
