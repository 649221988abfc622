use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::metrics::DELETED_ITEMS_METRIC;
use crate::metrics::SCANNED_PAGES_METRIC;
use crate::metrics::UNPROCESSED_RETRIES_METRIC;
use crate::utils::async_task::retry_until_drained;
use crate::BackoffPolicy;
use crate::Error;
use crate::Key;
use crate::Result;
use crate::ScanRequest;
use crate::Segment;
use crate::SegmentConfig;
use crate::StorageClient;
use crate::StorageError;
use crate::TruncateError;
use crate::WriteRequest;

/// Work done by one segment pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentReport {
    pub pages: u64,
    pub deleted: u64,
    pub unprocessed_retries: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChunkReport {
    pub deleted: u64,
    pub retries: u64,
}

/// Scan → delete loop over one segment of one table.
///
/// Pages are requested one at a time. Every page is split into chunks of at
/// most `batch_write_limit` keys which are deleted concurrently; the next
/// page is only requested once all chunks of the current one have settled.
pub struct SegmentPipeline<C: StorageClient> {
    client: Arc<C>,
    table: Arc<str>,
    key_attributes: Arc<[String]>,
    segment: Segment,
    batch_write_limit: usize,
    scan_page_limit: Option<u32>,
    backoff: BackoffPolicy,
}

impl<C: StorageClient> SegmentPipeline<C> {
    pub fn new(
        client: Arc<C>,
        table: Arc<str>,
        key_attributes: Arc<[String]>,
        segment: Segment,
        segment_config: &SegmentConfig,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            client,
            table,
            key_attributes,
            segment,
            batch_write_limit: segment_config.batch_write_limit.max(1),
            scan_page_limit: segment_config.scan_page_limit,
            backoff,
        }
    }

    /// Delete every item of the segment.
    ///
    /// Succeeds only once the scan is exhausted and every chunk has an empty
    /// unprocessed set. The first scan or chunk error ends the segment.
    pub async fn run(self) -> Result<SegmentReport> {
        info!(
            "[{}] Deleting segment {} of table '{}'...",
            self.segment,
            self.segment.index(),
            self.table
        );

        let mut report = SegmentReport::default();
        let mut cursor: Option<Key> = None;

        loop {
            let page = self
                .client
                .scan_segment(ScanRequest {
                    table: self.table.to_string(),
                    attributes: self.key_attributes.to_vec(),
                    segment: self.segment,
                    exclusive_start_key: cursor.take(),
                    limit: self.scan_page_limit,
                })
                .await?;
            report.pages += 1;
            SCANNED_PAGES_METRIC.with_label_values(&[self.table.as_ref()]).inc();
            trace!(
                "segment {} of '{}': page {} with {} items",
                self.segment,
                self.table,
                report.pages,
                page.items.len()
            );

            let page_report = self.delete_page(page.items).await?;
            report.deleted += page_report.deleted;
            report.unprocessed_retries += page_report.retries;

            match page.last_evaluated_key {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        info!(
            "[{}] Segment {} of table '{}' was deleted ({} keys, {} pages).",
            self.segment,
            self.segment.index(),
            self.table,
            report.deleted,
            report.pages
        );
        Ok(report)
    }

    /// Delete one page worth of keys, all chunks in flight at once.
    async fn delete_page(
        &self,
        keys: Vec<Key>,
    ) -> Result<ChunkReport> {
        let mut chunks = JoinSet::new();
        let mut keys = keys.into_iter().peekable();
        while keys.peek().is_some() {
            let chunk: Vec<Key> = keys.by_ref().take(self.batch_write_limit).collect();
            chunks.spawn(delete_chunk(
                self.client.clone(),
                self.table.clone(),
                chunk,
                self.batch_write_limit,
                self.backoff,
            ));
        }

        let mut page_report = ChunkReport::default();
        let mut first_error: Option<Error> = None;
        while let Some(joined) = chunks.join_next().await {
            match joined {
                Ok(Ok(chunk_report)) => {
                    page_report.deleted += chunk_report.deleted;
                    page_report.retries += chunk_report.retries;
                }
                Ok(Err(e)) => {
                    debug!("chunk delete on '{}' failed: {:?}", self.table, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(TruncateError::TaskFailed(e).into());
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(page_report),
        }
    }
}

/// Delete one chunk, resubmitting unprocessed keys with backoff until none remain.
pub(crate) async fn delete_chunk<C: StorageClient>(
    client: Arc<C>,
    table: Arc<str>,
    keys: Vec<Key>,
    batch_write_limit: usize,
    backoff: BackoffPolicy,
) -> Result<ChunkReport> {
    if keys.len() > batch_write_limit {
        return Err(StorageError::InvalidRequest(format!(
            "chunk of {} keys exceeds the batch write limit of {}",
            keys.len(),
            batch_write_limit
        ))
        .into());
    }

    let deleted = keys.len() as u64;
    let requests: Vec<WriteRequest> = keys.into_iter().map(WriteRequest::Delete).collect();

    let stats = retry_until_drained(
        |pending| {
            let client = client.clone();
            let table = table.clone();
            async move { client.batch_write(&table, pending).await }
        },
        requests,
        backoff,
    )
    .await?;

    let retries = stats.retries() as u64;
    DELETED_ITEMS_METRIC.with_label_values(&[table.as_ref()]).inc_by(deleted);
    if retries > 0 {
        UNPROCESSED_RETRIES_METRIC.with_label_values(&[table.as_ref()]).inc_by(retries);
    }

    Ok(ChunkReport { deleted, retries })
}
