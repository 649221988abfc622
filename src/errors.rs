//! Truncation Error Hierarchy
//!
//! Defines the error types surfaced by the truncation engine, categorized by
//! the layer that produced them: configuration, the storage service, and the
//! engine's own orchestration.

use config::ConfigError;
use tokio::task::JoinError;

use crate::LifecyclePhase;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures reported by (or while talking to) the storage service
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Scan/delete orchestration and table lifecycle failures
    #[error(transparent)]
    Truncate(#[from] TruncateError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The table does not exist (or no longer exists)
    #[error("Table '{0}' is not found")]
    TableNotFound(String),

    /// Request rate exceeded the table's throughput
    #[error("Throughput exceeded on table '{table}': {message}")]
    Throttled { table: String, message: String },

    /// Transport or service failure with source context
    #[error("{operation} on table '{table}' failed: {source}")]
    Service {
        operation: &'static str,
        table: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The table did not reach the awaited state in time
    #[error("Table '{table}' did not become {target} after {attempts} polls")]
    WaiterTimeout {
        table: String,
        target: &'static str,
        attempts: u32,
    },

    /// Table metadata that cannot be represented or replayed
    #[error("Invalid table schema: {0}")]
    InvalidSchema(String),

    /// Request rejected before reaching the service
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TruncateError {
    #[error("Segment {index} is out of range for {total} total segments")]
    InvalidSegment { index: u32, total: u32 },

    /// Only reachable with a non-zero `max_retries`
    #[error("{remaining} items still unprocessed after {attempts} batch write attempts")]
    RetriesExhausted { remaining: usize, attempts: usize },

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("Recreating table '{table}' failed while {phase}: {source}")]
    Lifecycle {
        table: String,
        phase: LifecyclePhase,
        #[source]
        source: Box<Error>,
    },
}

/// A failure attributed to one requested table.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct TableError {
    pub table: String,
    #[source]
    pub source: Error,
}

impl TableError {
    pub fn new(
        table: impl Into<String>,
        source: Error,
    ) -> Self {
        Self {
            table: table.into(),
            source,
        }
    }
}

impl Error {
    /// True when the error means the table does not exist.
    pub fn is_table_not_found(&self) -> bool {
        match self {
            Error::Storage(StorageError::TableNotFound(_)) => true,
            Error::Truncate(TruncateError::Lifecycle { source, .. }) => source.is_table_not_found(),
            _ => false,
        }
    }
}
