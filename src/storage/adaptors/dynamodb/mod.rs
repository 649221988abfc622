//! DynamoDB backend, compiled with the `dynamodb` feature.
mod convert;
mod dynamodb_storage_client;

pub use dynamodb_storage_client::*;
