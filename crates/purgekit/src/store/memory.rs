//! # Memory Store
//!
//! An in-process key/value store built on Moka. Used when the object cache
//! lives inside the host process, and as a stand-in for a Redis server in tests.

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use tracing::debug;

use super::provider::{KeyValueStore, StoreResult};

const DEFAULT_CAPACITY: u64 = 100_000;

#[derive(Clone)]
pub struct MemoryStore {
    cache: MokaCache<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store holding at most `max_entries` keys
    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            cache: MokaCache::builder().max_capacity(max_entries).build(),
        }
    }

    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.cache.insert(key.into(), value.into()).await;
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Number of live keys
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Memory store flushed");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let matching: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.to_string())
            .collect();

        for key in &matching {
            self.cache.invalidate(key).await;
        }
        self.cache.run_pending_tasks().await;

        debug!(prefix, removed = matching.len(), "Deleted keys from memory store");
        Ok(matching.len() as u64)
    }
}
