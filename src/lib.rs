//! Bulk-empties (or empties-and-rebuilds) tables in a horizontally
//! partitioned key-value store without reading the dataset into one process
//! and without exceeding per-request item limits.
//!
//! ```ignore
//! let client = Arc::new(MemoryStorageClient::new());
//! let truncator = Truncator::new(client, TruncatorConfig::default());
//! let errors = truncator.truncate(&["user", "item"], TruncateMode::InPlace).await;
//! ```
mod config;
mod constants;
mod errors;
mod storage;
mod truncate;

pub mod metrics;
pub mod utils;

pub use crate::config::*;
pub use constants::*;
pub use errors::*;
pub use storage::*;
pub use truncate::*;

#[cfg(test)]
pub mod test_utils;
