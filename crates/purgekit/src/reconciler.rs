//! # Status Reconciler
//!
//! Asks every registered adapter for its state and collects the answers into
//! one map. Nothing is cached; every call probes again.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::backend::{BackendAdapter, BackendKind, BackendStatus};
use crate::registry::AdapterRegistry;

#[derive(Debug, Clone)]
pub struct StatusReconciler {
    registry: Arc<AdapterRegistry>,
}

impl StatusReconciler {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    /// Status of every registered backend, queried concurrently
    pub async fn get_all_status(&self) -> BTreeMap<BackendKind, BackendStatus> {
        let probes = self
            .registry
            .iter()
            .map(|(kind, adapter)| async move { (kind, probe(kind, adapter.as_ref()).await) });

        let statuses: BTreeMap<_, _> = join_all(probes).await.into_iter().collect();
        debug!(
            active = statuses.values().filter(|s| s.is_active()).count(),
            total = statuses.len(),
            "Backend status reconciled"
        );
        statuses
    }

    /// `None` when no adapter is registered for `kind`
    pub async fn get_status(&self, kind: BackendKind) -> Option<BackendStatus> {
        let adapter = self.registry.get(kind)?;
        Some(probe(kind, adapter.as_ref()).await)
    }
}

async fn probe(kind: BackendKind, adapter: &dyn BackendAdapter) -> BackendStatus {
    match AssertUnwindSafe(adapter.status()).catch_unwind().await {
        Ok(status) => status,
        Err(_) => {
            warn!(backend = kind.slug(), "Adapter panicked while reporting status");
            BackendStatus::error(kind, "Internal error while reading backend status")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendState, PurgeOutcome};
    use async_trait::async_trait;
    use crate::test_utils::StaticAdapter;

    struct BrokenStatus;

    #[async_trait]
    impl BackendAdapter for BrokenStatus {
        fn kind(&self) -> BackendKind {
            BackendKind::ObjectCache
        }

        async fn status(&self) -> BackendStatus {
            panic!("status probe exploded")
        }

        async fn purge(&self) -> PurgeOutcome {
            PurgeOutcome::success(BackendKind::ObjectCache, "")
        }
    }

    #[tokio::test]
    async fn test_all_status_covers_every_registered_kind() {
        let registry = AdapterRegistry::new()
            .with(Arc::new(StaticAdapter::succeeding(BackendKind::CdnCache).with_status(
                BackendStatus::not_configured(BackendKind::CdnCache, "Missing CDN credentials: email"),
            )))
            .with(Arc::new(StaticAdapter::succeeding(BackendKind::EdgeCache)))
            .with(Arc::new(BrokenStatus));
        let reconciler = StatusReconciler::new(Arc::new(registry));

        let statuses = reconciler.get_all_status().await;

        assert_eq!(
            statuses.keys().copied().collect::<Vec<_>>(),
            vec![BackendKind::EdgeCache, BackendKind::ObjectCache, BackendKind::CdnCache]
        );
        assert_eq!(statuses[&BackendKind::EdgeCache].state, BackendState::Active);
        assert_eq!(statuses[&BackendKind::ObjectCache].state, BackendState::Error);
        assert_eq!(statuses[&BackendKind::CdnCache].state, BackendState::NotConfigured);
    }

    #[tokio::test]
    async fn test_single_status() {
        let registry = AdapterRegistry::new().with(Arc::new(StaticAdapter::succeeding(BackendKind::EdgeCache)));
        let reconciler = StatusReconciler::new(Arc::new(registry));

        assert!(reconciler.get_status(BackendKind::EdgeCache).await.is_some());
        assert!(reconciler.get_status(BackendKind::CdnCache).await.is_none());
    }
}
