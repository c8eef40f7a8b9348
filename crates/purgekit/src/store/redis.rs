//! # Redis Store
//!
//! Redis-protocol client used for the edge cache's store mode and the object cache.

use async_trait::async_trait;
use redis::Client;
use redis::aio::MultiplexedConnection;
use tracing::debug;

use super::provider::{KeyValueStore, StoreResult};
use crate::error::StoreError;

/// Keys requested per `SCAN` round trip
const SCAN_BATCH: usize = 500;

#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Create a client for `url`. No connection is made until the first command.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let response: String = redis::cmd("PING").query_async(&mut conn).await?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Command(format!(
                "PING returned unexpected response: {response}"
            )))
        }
    }

    async fn flush_all(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        debug!("Redis database flushed");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", escape_glob(prefix));

        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(prefix, removed, "Deleted keys from Redis");
        Ok(removed)
    }
}

/// Escape glob metacharacters so `prefix` matches literally in `SCAN MATCH`
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
