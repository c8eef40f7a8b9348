//! # Key/Value Store
//!
//! This module defines the store trait that all store clients must follow.

use async_trait::async_trait;

use crate::error::StoreError;

/// Result of a store operation
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The subset of a key/value store a purge needs
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short name of the client, reported as the backend mechanism
    fn name(&self) -> &'static str;

    /// Check that the store answers
    async fn ping(&self) -> StoreResult<()>;

    /// Remove every key in the store's database
    async fn flush_all(&self) -> StoreResult<()>;

    /// Remove every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64>;
}
