// -
// Service limits

/// One mebibyte, the table size assigned to one scan segment by default
pub const MEGABYTE: u64 = 1 << 20;

/// Guards against pathological table sizes
pub const MAX_TOTAL_SEGMENTS: u32 = 1_000_000;

/// Items accepted by a single batch write request
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;
