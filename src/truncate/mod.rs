//! The truncation engine.
//!
//! - [`plan_segments`] sizes the parallel scan of a table.
//! - [`SegmentPipeline`] scans one segment and batch-deletes what it finds,
//!   resubmitting unprocessed keys with bounded exponential backoff.
//! - [`TableLifecycle`] drops and recreates a table from a schema snapshot.
//! - [`Truncator`] runs one of the two strategies per requested table and
//!   gathers per-table failures.
mod coordinator;
mod lifecycle;
mod pipeline;
mod planner;

pub use coordinator::*;
pub use lifecycle::*;
pub use pipeline::*;
pub use planner::*;
