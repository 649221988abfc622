mod mem_storage_client;

pub use mem_storage_client::*;
