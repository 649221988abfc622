use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;
use crate::MAX_BATCH_WRITE_ITEMS;

/// Segment planning and batch sizing for in-place truncation
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Bytes of table data assigned to one parallel segment
    #[serde(default = "default_segment_size_bytes")]
    pub segment_size_bytes: u64,

    /// Upper bound on parallel segments, regardless of table size
    #[serde(default = "default_max_total_segments")]
    pub max_total_segments: u32,

    /// Delete requests per batch write; the service accepts at most 25
    #[serde(default = "default_batch_write_limit")]
    pub batch_write_limit: usize,

    /// Optional item limit per scan page. `None` lets the service decide.
    #[serde(default)]
    pub scan_page_limit: Option<u32>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            segment_size_bytes: default_segment_size_bytes(),
            max_total_segments: default_max_total_segments(),
            batch_write_limit: default_batch_write_limit(),
            scan_page_limit: None,
        }
    }
}

impl SegmentConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.segment_size_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "segment.segment_size_bytes cannot be 0".into(),
            )));
        }

        if self.max_total_segments == 0 {
            return Err(Error::Config(ConfigError::Message(
                "segment.max_total_segments must be at least 1".into(),
            )));
        }

        if self.batch_write_limit == 0 || self.batch_write_limit > MAX_BATCH_WRITE_ITEMS {
            return Err(Error::Config(ConfigError::Message(format!(
                "segment.batch_write_limit must be between 1 and {}, got {}",
                MAX_BATCH_WRITE_ITEMS, self.batch_write_limit
            ))));
        }

        if self.scan_page_limit == Some(0) {
            return Err(Error::Config(ConfigError::Message(
                "segment.scan_page_limit cannot be 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_segment_size_bytes() -> u64 {
    crate::MEGABYTE
}
fn default_max_total_segments() -> u32 {
    crate::MAX_TOTAL_SEGMENTS
}
fn default_batch_write_limit() -> usize {
    MAX_BATCH_WRITE_ITEMS
}
