use std::fmt;

use crate::Result;
use crate::SegmentConfig;
use crate::TruncateError;

/// A disjoint slice of a table's keyspace, scanned independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    index: u32,
    total: u32,
}

impl Segment {
    /// # Errors
    /// [`TruncateError::InvalidSegment`] unless `index < total`
    pub fn new(
        index: u32,
        total: u32,
    ) -> Result<Self> {
        if index >= total {
            return Err(TruncateError::InvalidSegment { index, total }.into());
        }
        Ok(Self { index, total })
    }

    /// Every segment of a `total`-way split, in index order.
    pub fn all(total: u32) -> impl Iterator<Item = Segment> {
        (0..total).map(move |index| Segment { index, total })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

impl fmt::Display for Segment {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.index + 1, self.total)
    }
}

/// Number of segments to scan in parallel for a table of `size_bytes`.
///
/// `ceil(size_bytes / segment_size_bytes)`, capped at `max_total_segments`.
/// Zero means the table is empty and nothing should be scheduled.
pub fn plan_segments(
    size_bytes: u64,
    config: &SegmentConfig,
) -> u32 {
    let segment_size = config.segment_size_bytes.max(1);
    let wanted = size_bytes.div_ceil(segment_size);
    wanted.min(u64::from(config.max_total_segments)) as u32
}
