use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::metrics::TABLE_FAILURES_METRIC;
use crate::plan_segments;
use crate::Error;
use crate::Result;
use crate::Segment;
use crate::SegmentPipeline;
use crate::SegmentReport;
use crate::StorageClient;
use crate::TableError;
use crate::TableLifecycle;
use crate::TruncateError;
use crate::TruncatorConfig;

/// How every table of one invocation is emptied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateMode {
    /// Scan and batch-delete every item; the table stays available
    InPlace,
    /// Drop and recreate the table with the same schema
    Recreate,
}

impl TruncateMode {
    pub fn from_recreate_flag(recreate: bool) -> Self {
        if recreate {
            TruncateMode::Recreate
        } else {
            TruncateMode::InPlace
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TruncateMode::InPlace => "in_place",
            TruncateMode::Recreate => "recreate",
        }
    }
}

impl fmt::Display for TruncateMode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals for one in-place truncation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncateReport {
    pub segments: u32,
    pub pages: u64,
    pub deleted: u64,
    pub unprocessed_retries: u64,
}

impl TruncateReport {
    fn absorb(
        &mut self,
        segment: SegmentReport,
    ) {
        self.pages += segment.pages;
        self.deleted += segment.deleted;
        self.unprocessed_retries += segment.unprocessed_retries;
    }
}

/// Entry point of the engine: fans out over tables and collects failures.
pub struct Truncator<C: StorageClient> {
    client: Arc<C>,
    config: Arc<TruncatorConfig>,
}

impl<C: StorageClient> Clone for Truncator<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: StorageClient> Truncator<C> {
    pub fn new(
        client: Arc<C>,
        config: TruncatorConfig,
    ) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Empty every named table, one concurrent unit per distinct table.
    ///
    /// Units never wait on or cancel each other. Repeated names are only
    /// processed once.
    ///
    /// # Returns
    /// One [`TableError`] per failed table, in completion order. An empty
    /// vector means every table was emptied (or already was).
    pub async fn truncate<S: AsRef<str>>(
        &self,
        tables: &[S],
        mode: TruncateMode,
    ) -> Vec<TableError> {
        let errors: Arc<Mutex<Vec<TableError>>> = Arc::new(Mutex::new(Vec::new()));

        let mut seen = HashSet::new();
        let mut units = Vec::with_capacity(tables.len());
        for table in tables.iter().map(AsRef::as_ref) {
            if !seen.insert(table) {
                warn!("Table '{}' was requested more than once, skipping the duplicate.", table);
                continue;
            }

            let this = self.clone();
            let errors = errors.clone();
            let name = table.to_string();
            let handle = tokio::spawn(async move {
                if let Err(e) = this.truncate_one(&name, mode).await {
                    error!("Truncating table '{}' failed: {}", name, e);
                    TABLE_FAILURES_METRIC.with_label_values(&[name.as_str(), mode.as_str()]).inc();
                    errors.lock().push(TableError::new(name, e));
                }
            });
            units.push((table.to_string(), handle));
        }

        let (names, handles): (Vec<String>, Vec<_>) = units.into_iter().unzip();
        for (name, joined) in names.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                error!("Truncation unit for table '{}' panicked: {}", name, e);
                TABLE_FAILURES_METRIC.with_label_values(&[name.as_str(), mode.as_str()]).inc();
                errors.lock().push(TableError::new(name, TruncateError::TaskFailed(e).into()));
            }
        }

        let mut errors = errors.lock();
        std::mem::take(&mut *errors)
    }

    async fn truncate_one(
        &self,
        table: &str,
        mode: TruncateMode,
    ) -> Result<()> {
        match mode {
            TruncateMode::InPlace => self.truncate_in_place(table).await.map(|_| ()),
            TruncateMode::Recreate => TableLifecycle::new(self.client.clone(), self.config.retry.waiter)
                .recreate(table)
                .await
                .map(|_| ()),
        }
    }

    /// Delete every item of `table` through parallel segment pipelines.
    ///
    /// The first failing segment aborts its siblings and fails the table.
    pub async fn truncate_in_place(
        &self,
        table: &str,
    ) -> Result<TruncateReport> {
        let meta = self.client.describe_table(table).await?;
        let total = plan_segments(meta.size_bytes, &self.config.segment);
        if total == 0 {
            warn!("Table '{}' has no items.", table);
            return Ok(TruncateReport::default());
        }

        info!("[0/{}] Truncating the table '{}'...", total, table);
        let table_name: Arc<str> = Arc::from(table);
        let key_attributes: Arc<[String]> = meta.key_attribute_names().into();

        let mut segments = JoinSet::new();
        for segment in Segment::all(total) {
            let pipeline = SegmentPipeline::new(
                self.client.clone(),
                table_name.clone(),
                key_attributes.clone(),
                segment,
                &self.config.segment,
                self.config.retry.unprocessed,
            );
            segments.spawn(pipeline.run());
        }

        let mut report = TruncateReport {
            segments: total,
            ..Default::default()
        };
        while let Some(joined) = segments.join_next().await {
            let failure: Error = match joined {
                Ok(Ok(segment_report)) => {
                    report.absorb(segment_report);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => TruncateError::TaskFailed(e).into(),
            };
            segments.shutdown().await;
            return Err(failure);
        }

        info!(
            "[{}/{}] Table '{}' was truncated successfully ({} keys deleted).",
            total, total, table, report.deleted
        );
        Ok(report)
    }
}
