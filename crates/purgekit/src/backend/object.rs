//! # Object Cache
//!
//! The application's key/value object cache. Active only when the store
//! client is available, the integration drop-in is installed and the store
//! answers a ping. A purge flushes the whole store database: every key goes,
//! including keys written by anything else sharing that database.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::adapter::BackendAdapter;
use super::types::{BackendKind, BackendState, BackendStatus, FailureKind, PurgeOutcome};
use crate::config::{ObjectCacheConfig, TimeoutConfig};
use crate::store::{self, StoreHandle};

#[derive(Debug)]
pub struct ObjectCacheAdapter {
    store: StoreHandle,
    drop_in: Option<PathBuf>,
    probe_timeout: Duration,
    purge_timeout: Duration,
}

impl ObjectCacheAdapter {
    pub fn new(store: impl Into<StoreHandle>) -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            store: store.into(),
            drop_in: None,
            probe_timeout: timeouts.probe(),
            purge_timeout: timeouts.purge(),
        }
    }

    pub fn from_config(config: &ObjectCacheConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            store: StoreHandle::from_url(&config.url),
            drop_in: config.drop_in_path().map(Path::to_path_buf),
            probe_timeout: timeouts.probe(),
            purge_timeout: timeouts.purge(),
        }
    }

    /// Require the integration drop-in at `path` for the cache to count as active
    pub fn with_drop_in(mut self, path: impl Into<PathBuf>) -> Self {
        self.drop_in = Some(path.into());
        self
    }

    pub fn with_timeouts(mut self, probe: Duration, purge: Duration) -> Self {
        self.probe_timeout = probe;
        self.purge_timeout = purge;
        self
    }

    /// `Err` carries the reason the drop-in does not count as installed
    async fn check_drop_in(&self) -> Result<(), String> {
        let Some(path) = &self.drop_in else {
            return Err("No object cache drop-in path configured".to_string());
        };
        match tokio::fs::try_exists(path).await {
            Ok(true) => Ok(()),
            _ => Err(format!("Object cache drop-in not installed at {}", path.display())),
        }
    }
}

#[async_trait]
impl BackendAdapter for ObjectCacheAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectCache
    }

    async fn status(&self) -> BackendStatus {
        let kind = BackendKind::ObjectCache;

        let store = match &self.store {
            StoreHandle::Missing => {
                return BackendStatus::not_configured(kind, "No object cache store URL configured");
            }
            StoreHandle::Failed(e) if e.failure_kind() == FailureKind::Unavailable => {
                return BackendStatus::new(kind, BackendState::Inactive, e.to_string());
            }
            StoreHandle::Failed(e) => return BackendStatus::error(kind, e.to_string()),
            StoreHandle::Ready(store) => store,
        };

        if let Err(detail) = self.check_drop_in().await {
            return BackendStatus::new(kind, BackendState::Inactive, detail)
                .with_mechanism(store.name());
        }

        match store::bounded(self.probe_timeout, store.ping()).await {
            Ok(()) => BackendStatus::active(kind, format!("Connected to {} store", store.name()))
                .with_mechanism(store.name()),
            Err(e) => BackendStatus::new(
                kind,
                BackendState::NotConnected,
                format!("{} store did not answer: {e}", store.name()),
            )
            .with_mechanism(store.name()),
        }
    }

    async fn purge(&self) -> PurgeOutcome {
        let kind = BackendKind::ObjectCache;

        let store = match &self.store {
            StoreHandle::Missing => {
                return PurgeOutcome::failure(
                    kind,
                    FailureKind::NotConfigured,
                    "Object cache is not configured",
                );
            }
            StoreHandle::Failed(e) => {
                return PurgeOutcome::failure(kind, e.failure_kind(), e.to_string());
            }
            StoreHandle::Ready(store) => store,
        };

        match store::bounded(self.purge_timeout, store.flush_all()).await {
            Ok(()) => {
                info!(store = store.name(), "Object cache flushed");
                PurgeOutcome::success(kind, format!("Flushed every key in the {} store", store.name()))
            }
            Err(e) => {
                warn!(store = store.name(), error = %e, "Object cache flush failed");
                PurgeOutcome::failure(kind, e.failure_kind(), format!("Object cache flush failed: {e}"))
            }
        }
    }
}
