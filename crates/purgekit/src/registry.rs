//! # Adapter Registry
//!
//! The set of backends a [`crate::PurgeOrchestrator`] and a
//! [`crate::StatusReconciler`] can reach, keyed by [`BackendKind`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::backend::{
    BackendAdapter, BackendKind, CdnCacheAdapter, EdgeCacheAdapter, ObjectCacheAdapter,
    PlatformOptimizationAdapter, PurgeHook,
};
use crate::config::PurgeConfig;
use crate::error::ConfigError;

#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<BackendKind, Arc<dyn BackendAdapter>>,
    // Kept typed so hooks can be registered after construction
    edge: Option<Arc<EdgeCacheAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all four adapters from configuration.
    ///
    /// Fails only when the CDN HTTP client cannot be constructed; missing
    /// credentials or store URLs produce adapters that report themselves as
    /// not configured.
    pub fn from_config(config: &PurgeConfig) -> Result<Self, ConfigError> {
        let timeouts = &config.timeouts;

        let edge = Arc::new(EdgeCacheAdapter::from_config(&config.edge, timeouts));
        let object = Arc::new(ObjectCacheAdapter::from_config(&config.object, timeouts));
        let cdn = Arc::new(CdnCacheAdapter::from_config(&config.cdn, timeouts)?);
        let platform = Arc::new(PlatformOptimizationAdapter::new(
            cdn.clone(),
            config.cdn.platform_optimization,
        ));

        let mut registry = Self::new();
        registry.register_edge(edge);
        registry.register(object);
        registry.register(cdn);
        registry.register(platform);

        debug!(kinds = ?registry.kinds(), "Adapter registry built from configuration");
        Ok(registry)
    }

    /// Add or replace the adapter for `adapter.kind()`
    pub fn register(&mut self, adapter: Arc<dyn BackendAdapter>) -> &mut Self {
        let kind = adapter.kind();
        if kind == BackendKind::EdgeCache {
            self.edge = None;
        }
        self.adapters.insert(kind, adapter);
        self
    }

    /// Register the edge adapter, keeping a typed handle for hook management
    pub fn register_edge(&mut self, edge: Arc<EdgeCacheAdapter>) -> &mut Self {
        self.adapters
            .insert(BackendKind::EdgeCache, edge.clone() as Arc<dyn BackendAdapter>);
        self.edge = Some(edge);
        self
    }

    pub fn with(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn BackendAdapter>> {
        self.adapters.get(&kind)
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Registered kinds in canonical order
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.adapters.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackendKind, &Arc<dyn BackendAdapter>)> {
        self.adapters.iter().map(|(kind, adapter)| (*kind, adapter))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn edge(&self) -> Option<&Arc<EdgeCacheAdapter>> {
        self.edge.as_ref()
    }

    /// Register the edge cache purge hook. Returns false when the edge adapter
    /// was not registered through [`AdapterRegistry::register_edge`].
    pub fn register_edge_hook(&self, hook: Arc<dyn PurgeHook>) -> bool {
        match &self.edge {
            Some(edge) => {
                edge.register_hook(hook);
                true
            }
            None => false,
        }
    }

    pub fn clear_edge_hook(&self) {
        if let Some(edge) = &self.edge {
            edge.clear_hook();
        }
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
