use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::Hash;
use std::hash::Hasher;
use std::ops::Bound;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;
use tracing::trace;

use crate::item_size_bytes;
use crate::CreateTableSpec;
use crate::Error;
use crate::Item;
use crate::Key;
use crate::KeySchemaElement;
use crate::Result;
use crate::ScanPage;
use crate::ScanRequest;
use crate::StorageClient;
use crate::StorageError;
use crate::TableMetadata;
use crate::TableStatus;
use crate::WriteRequest;
use crate::MAX_BATCH_WRITE_ITEMS;

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct MemoryTable {
    meta: TableMetadata,
    items: BTreeMap<Key, Item>,
    ready_at: Instant,
}

impl MemoryTable {
    fn describe(
        &self,
        now: Instant,
    ) -> TableMetadata {
        let mut meta = self.meta.clone();
        meta.size_bytes = self.items.values().map(item_size_bytes).sum();
        meta.item_count = self.items.len() as u64;
        meta.status = if now < self.ready_at {
            TableStatus::Creating
        } else {
            TableStatus::Active
        };
        meta
    }
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemoryTable>,
    /// Deleted tables that still report `DELETING` until the deadline
    dropping: HashMap<String, (TableMetadata, Instant)>,
}

impl State {
    fn dropping(
        &self,
        table: &str,
        now: Instant,
    ) -> Option<&TableMetadata> {
        self.dropping
            .get(table)
            .filter(|(_, until)| now < *until)
            .map(|(meta, _)| meta)
    }
}

#[derive(Debug, Default)]
struct UnprocessedInjection {
    count: usize,
    remaining_batches: usize,
}

/// In-process storage service.
///
/// Items are kept per table in key order. Segment membership is a stable
/// hash of the primary key, so concurrent deletes never move an item to a
/// different segment mid-scan.
#[derive(Debug)]
pub struct MemoryStorageClient {
    state: RwLock<State>,
    injection: Mutex<UnprocessedInjection>,
    page_size: usize,
    lifecycle_delay: Duration,
    last_created: Mutex<SystemTime>,

    batch_write_calls: AtomicU64,
    max_batch_seen: AtomicUsize,
}

impl Default for MemoryStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            injection: Mutex::new(UnprocessedInjection::default()),
            page_size: DEFAULT_PAGE_SIZE,
            lifecycle_delay: Duration::ZERO,
            last_created: Mutex::new(SystemTime::UNIX_EPOCH),
            batch_write_calls: AtomicU64::new(0),
            max_batch_seen: AtomicUsize::new(0),
        }
    }

    /// Most items returned by one scan page
    pub fn with_page_size(
        mut self,
        page_size: usize,
    ) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Time a created table stays `CREATING` and a deleted one `DELETING`
    pub fn with_lifecycle_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.lifecycle_delay = delay;
        self
    }

    /// Leave the last `count` requests of each of the next `batches` batch
    /// writes unprocessed.
    pub fn inject_unprocessed(
        &self,
        count: usize,
        batches: usize,
    ) {
        *self.injection.lock() = UnprocessedInjection {
            count,
            remaining_batches: batches,
        };
    }

    /// Write `items` in batch-sized chunks, resubmitting anything unprocessed.
    pub async fn put_items(
        &self,
        table: &str,
        items: Vec<Item>,
    ) -> Result<()> {
        let mut pending: Vec<WriteRequest> = items.into_iter().map(WriteRequest::Put).collect();
        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(MAX_BATCH_WRITE_ITEMS));
            let unprocessed = self.batch_write(table, pending).await?;
            pending = unprocessed.into_iter().chain(rest).collect();
        }
        Ok(())
    }

    pub fn item_count(
        &self,
        table: &str,
    ) -> Option<u64> {
        self.state.read().tables.get(table).map(|t| t.items.len() as u64)
    }

    pub fn batch_write_calls(&self) -> u64 {
        self.batch_write_calls.load(Ordering::SeqCst)
    }

    /// Largest request count ever received by one batch write
    pub fn max_batch_seen(&self) -> usize {
        self.max_batch_seen.load(Ordering::SeqCst)
    }

    fn next_creation_time(&self) -> SystemTime {
        let mut last = self.last_created.lock();
        let now = SystemTime::now();
        let next = if now > *last {
            now
        } else {
            *last + Duration::from_micros(1)
        };
        *last = next;
        next
    }

    fn take_unprocessed(
        &self,
        requests: &mut Vec<WriteRequest>,
    ) -> Vec<WriteRequest> {
        let mut injection = self.injection.lock();
        if injection.remaining_batches == 0 || injection.count == 0 {
            return Vec::new();
        }
        injection.remaining_batches -= 1;
        let keep = requests.len().saturating_sub(injection.count);
        requests.split_off(keep)
    }
}

fn key_of(
    key_schema: &[KeySchemaElement],
    item: &Item,
) -> Result<Key> {
    key_schema
        .iter()
        .map(|k| match item.get(&k.name) {
            Some(value) => Ok((k.name.clone(), value.clone())),
            None => Err(Error::from(StorageError::InvalidRequest(format!(
                "missing key attribute '{}'",
                k.name
            )))),
        })
        .collect()
}

fn segment_of(
    key: &Key,
    total: u32,
) -> u32 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % u64::from(total)) as u32
}

fn project(
    item: &Item,
    attributes: &[String],
) -> Item {
    if attributes.is_empty() {
        return item.clone();
    }
    attributes
        .iter()
        .filter_map(|name| item.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn describe_table(
        &self,
        table: &str,
    ) -> Result<TableMetadata> {
        let now = Instant::now();
        let state = self.state.read();
        if let Some(t) = state.tables.get(table) {
            return Ok(t.describe(now));
        }
        if let Some(meta) = state.dropping(table, now) {
            let mut meta = meta.clone();
            meta.status = TableStatus::Deleting;
            return Ok(meta);
        }
        Err(StorageError::TableNotFound(table.to_string()).into())
    }

    async fn scan_segment(
        &self,
        request: ScanRequest,
    ) -> Result<ScanPage> {
        let state = self.state.read();
        let table = state
            .tables
            .get(&request.table)
            .ok_or_else(|| StorageError::TableNotFound(request.table.clone()))?;

        let limit = request
            .limit
            .map(|l| (l as usize).min(self.page_size))
            .unwrap_or(self.page_size)
            .max(1);
        let lower = match &request.exclusive_start_key {
            Some(cursor) => Bound::Excluded(cursor),
            None => Bound::Unbounded,
        };

        let segment = request.segment;
        let mut matching = table
            .items
            .range::<Key, _>((lower, Bound::Unbounded))
            .filter(|(key, _)| segment_of(key, segment.total()) == segment.index());

        let mut items = Vec::with_capacity(limit);
        let mut last_key = None;
        for (key, item) in matching.by_ref().take(limit) {
            items.push(project(item, &request.attributes));
            last_key = Some(key.clone());
        }
        let last_evaluated_key = if matching.next().is_some() {
            last_key
        } else {
            None
        };

        trace!(
            "scan '{}' segment {}: {} items, more: {}",
            request.table,
            segment,
            items.len(),
            last_evaluated_key.is_some()
        );
        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn batch_write(
        &self,
        table: &str,
        mut requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>> {
        self.batch_write_calls.fetch_add(1, Ordering::SeqCst);
        self.max_batch_seen.fetch_max(requests.len(), Ordering::SeqCst);

        if requests.len() > MAX_BATCH_WRITE_ITEMS {
            return Err(StorageError::InvalidRequest(format!(
                "batch write of {} requests exceeds the limit of {}",
                requests.len(),
                MAX_BATCH_WRITE_ITEMS
            ))
            .into());
        }

        let mut state = self.state.write();
        let memory_table = state
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        // a malformed request rejects the whole batch before anything is applied
        let keys = requests
            .iter()
            .map(|request| match request {
                WriteRequest::Put(item) => key_of(&memory_table.meta.key_schema, item),
                WriteRequest::Delete(key) => key_of(&memory_table.meta.key_schema, key),
            })
            .collect::<Result<Vec<Key>>>()?;

        let unprocessed = self.take_unprocessed(&mut requests);
        for (request, key) in requests.into_iter().zip(keys) {
            match request {
                WriteRequest::Put(item) => {
                    memory_table.items.insert(key, item);
                }
                WriteRequest::Delete(_) => {
                    memory_table.items.remove(&key);
                }
            }
        }

        Ok(unprocessed)
    }

    async fn delete_table(
        &self,
        table: &str,
    ) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.write();
        let removed = state
            .tables
            .remove(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;

        debug!("dropped in-memory table '{}' ({} items)", table, removed.items.len());
        if !self.lifecycle_delay.is_zero() {
            let mut meta = removed.describe(now);
            meta.status = TableStatus::Deleting;
            state
                .dropping
                .insert(table.to_string(), (meta, now + self.lifecycle_delay));
        }
        Ok(())
    }

    async fn create_table(
        &self,
        spec: CreateTableSpec,
    ) -> Result<()> {
        spec.validate()?;

        let now = Instant::now();
        let mut state = self.state.write();
        if state.tables.contains_key(&spec.name) || state.dropping(&spec.name, now).is_some() {
            return Err(StorageError::InvalidRequest(format!(
                "table '{}' already exists",
                spec.name
            ))
            .into());
        }
        state.dropping.remove(&spec.name);

        let meta = TableMetadata {
            name: spec.name.clone(),
            attribute_definitions: spec.attribute_definitions,
            key_schema: spec.key_schema,
            size_bytes: 0,
            item_count: 0,
            status: TableStatus::Creating,
            created_at: self.next_creation_time(),
            billing_mode: spec.billing_mode,
            stream: spec.stream,
            global_secondary_indexes: spec.global_secondary_indexes,
            local_secondary_indexes: spec.local_secondary_indexes,
        };
        state.tables.insert(
            spec.name,
            MemoryTable {
                meta,
                items: BTreeMap::new(),
                ready_at: now + self.lifecycle_delay,
            },
        );
        Ok(())
    }
}
