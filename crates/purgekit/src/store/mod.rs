//! # Key/Value Stores
//!
//! The edge cache (in `store` mode) and the object cache both keep their data
//! in a Redis-protocol key/value store. This module defines the capability
//! the adapters need from such a store and its implementations.

pub use self::memory::MemoryStore;
pub use self::provider::{KeyValueStore, StoreResult};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;

// Store interface
pub mod provider;

// Individual store implementations
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

/// Open a client for the store at `url`.
///
/// Opening never connects; the first command does. Fails with
/// [`StoreError::Unavailable`] when client support for the URL's scheme is not
/// compiled in.
pub fn open(url: &str) -> StoreResult<Arc<dyn KeyValueStore>> {
    let url = url.trim();
    let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or_default();

    match scheme {
        "redis" | "rediss" | "redis+unix" | "unix" => open_redis(url),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "" => Err(StoreError::InvalidUrl(format!("missing scheme in '{url}'"))),
        other => Err(StoreError::InvalidUrl(format!("unsupported scheme '{other}'"))),
    }
}

/// A store client as far as configuration got
#[derive(Clone)]
pub enum StoreHandle {
    /// No store URL configured
    Missing,
    /// A URL is configured but no client could be created for it
    Failed(Arc<StoreError>),
    Ready(Arc<dyn KeyValueStore>),
}

impl StoreHandle {
    /// Resolve a configured URL; blank means [`StoreHandle::Missing`]
    pub fn from_url(url: &str) -> Self {
        if url.trim().is_empty() {
            return StoreHandle::Missing;
        }
        match open(url) {
            Ok(store) => StoreHandle::Ready(store),
            Err(e) => StoreHandle::Failed(Arc::new(e)),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, StoreHandle::Missing)
    }
}

impl From<Arc<dyn KeyValueStore>> for StoreHandle {
    fn from(store: Arc<dyn KeyValueStore>) -> Self {
        StoreHandle::Ready(store)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreHandle::Missing => f.write_str("Missing"),
            StoreHandle::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            StoreHandle::Ready(store) => f.debug_tuple("Ready").field(&store.name()).finish(),
        }
    }
}

/// Run a store operation with an upper bound on its duration
pub async fn bounded<T, F>(timeout: Duration, operation: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

#[cfg(feature = "redis")]
fn open_redis(url: &str) -> StoreResult<Arc<dyn KeyValueStore>> {
    Ok(Arc::new(RedisStore::open(url)?))
}

#[cfg(not(feature = "redis"))]
fn open_redis(_url: &str) -> StoreResult<Arc<dyn KeyValueStore>> {
    Err(StoreError::Unavailable(
        "built without the `redis` feature".to_string(),
    ))
}
