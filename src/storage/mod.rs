//! Storage service abstraction.
//!
//! The truncation engine is written against [`StorageClient`] only. Concrete
//! backends live under `adaptors`: an in-memory store used by tests and
//! demos, and (behind the `dynamodb` feature) the real service.
mod adaptors;
mod types;

#[cfg(test)]
mod types_test;

#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::trace;

pub use adaptors::*;
pub use types::*;

use crate::Result;
use crate::StorageError;
use crate::WaiterPolicy;

/// Operations the engine needs from the storage service.
///
/// One instance is shared read-only by every concurrent unit of a run, so
/// implementations must be safe for unsynchronized concurrent use.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageClient: Send + Sync + 'static {
    /// Snapshot a table's schema, size and throughput settings.
    ///
    /// # Errors
    /// - [`StorageError::TableNotFound`] if the table does not exist
    async fn describe_table(
        &self,
        table: &str,
    ) -> Result<TableMetadata>;

    /// Fetch one page of a segment, projected to `request.attributes`.
    async fn scan_segment(
        &self,
        request: ScanRequest,
    ) -> Result<ScanPage>;

    /// Submit a batch of puts/deletes against one table.
    ///
    /// # Returns
    /// The requests the service did not apply. An empty vector means the
    /// whole batch took effect; a non-empty one is not an error and must be
    /// resubmitted by the caller.
    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>>;

    async fn delete_table(
        &self,
        table: &str,
    ) -> Result<()>;

    async fn create_table(
        &self,
        spec: CreateTableSpec,
    ) -> Result<()>;

    /// Block until the table exists and is `ACTIVE`.
    ///
    /// Default implementation polls [`StorageClient::describe_table`] at the
    /// waiter's fixed interval. A table that exists but is still being
    /// created keeps the wait going.
    async fn await_exists(
        &self,
        table: &str,
        waiter: &WaiterPolicy,
    ) -> Result<()> {
        for attempt in 1..=waiter.max_attempts {
            match self.describe_table(table).await {
                Ok(meta) if meta.status == TableStatus::Active => return Ok(()),
                Ok(meta) => trace!("table '{}' is {} (poll {})", table, meta.status, attempt),
                Err(e) if e.is_table_not_found() => {
                    trace!("table '{}' not visible yet (poll {})", table, attempt)
                }
                Err(e) => return Err(e),
            }
            if attempt < waiter.max_attempts {
                sleep(waiter.poll_interval()).await;
            }
        }
        Err(StorageError::WaiterTimeout {
            table: table.to_string(),
            target: "active",
            attempts: waiter.max_attempts,
        }
        .into())
    }

    /// Block until describe reports the table as not found.
    async fn await_not_exists(
        &self,
        table: &str,
        waiter: &WaiterPolicy,
    ) -> Result<()> {
        for attempt in 1..=waiter.max_attempts {
            match self.describe_table(table).await {
                Err(e) if e.is_table_not_found() => return Ok(()),
                Err(e) => return Err(e),
                Ok(meta) => trace!("table '{}' is {} (poll {})", table, meta.status, attempt),
            }
            if attempt < waiter.max_attempts {
                sleep(waiter.poll_interval()).await;
            }
        }
        Err(StorageError::WaiterTimeout {
            table: table.to_string(),
            target: "deleted",
            attempts: waiter.max_attempts,
        }
        .into())
    }
}
