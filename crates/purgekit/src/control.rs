//! # Cache Control
//!
//! The single entry point hosts use: status for every backend, purges in
//! either execution mode, and the last recorded report.

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{BackendKind, BackendStatus, PurgeHook};
use crate::config::PurgeConfig;
use crate::error::{ConfigError, PurgeError};
use crate::execution::{BackgroundPurger, Dispatch, ExecutionMode};
use crate::orchestrator::PurgeOrchestrator;
use crate::reconciler::StatusReconciler;
use crate::registry::AdapterRegistry;
use crate::report::{PurgeReport, StatusSnapshot, TriggerSource};
use crate::result_store::{self, ResultStore};
use crate::selection::Selection;

#[derive(Debug, Clone)]
pub struct CacheControl {
    registry: Arc<AdapterRegistry>,
    reconciler: StatusReconciler,
    orchestrator: PurgeOrchestrator,
    background: BackgroundPurger,
}

impl CacheControl {
    pub fn new(registry: AdapterRegistry, results: Arc<dyn ResultStore>) -> Self {
        let registry = Arc::new(registry);
        Self::assemble(PurgeOrchestrator::new(registry, results))
    }

    /// Build adapters, result store and timeouts from configuration
    pub fn from_config(config: &PurgeConfig) -> Result<Self, ConfigError> {
        let registry = Arc::new(AdapterRegistry::from_config(config)?);
        let results = result_store::from_config(&config.result_store);
        let orchestrator = PurgeOrchestrator::new(registry, results)
            .with_adapter_timeout(config.timeouts.adapter());
        Ok(Self::assemble(orchestrator))
    }

    fn assemble(orchestrator: PurgeOrchestrator) -> Self {
        let registry = orchestrator.registry().clone();
        Self {
            reconciler: StatusReconciler::new(registry.clone()),
            background: BackgroundPurger::new(orchestrator.clone()),
            registry,
            orchestrator,
        }
    }

    pub async fn get_all_status(&self) -> BTreeMap<BackendKind, BackendStatus> {
        self.reconciler.get_all_status().await
    }

    pub async fn get_status(&self, kind: BackendKind) -> Option<BackendStatus> {
        self.reconciler.get_status(kind).await
    }

    /// Purge `selection` and wait for the report
    pub async fn purge(
        &self,
        selection: &Selection,
        trigger: TriggerSource,
    ) -> Result<PurgeReport, PurgeError> {
        self.orchestrator.purge(selection, trigger).await
    }

    pub async fn purge_all(&self, trigger: TriggerSource) -> Result<PurgeReport, PurgeError> {
        self.orchestrator.purge_all(trigger).await
    }

    pub async fn last_report(&self) -> Option<PurgeReport> {
        self.orchestrator.last_report().await
    }

    /// Current status of every backend plus the last purge
    pub async fn snapshot(&self) -> StatusSnapshot {
        let (statuses, last_purge) = tokio::join!(self.get_all_status(), self.last_report());
        StatusSnapshot {
            statuses,
            last_purge,
        }
    }

    /// Run a purge in the requested mode
    pub async fn dispatch(
        &self,
        mode: ExecutionMode,
        selection: Selection,
        trigger: TriggerSource,
    ) -> Result<Dispatch, PurgeError> {
        match mode {
            ExecutionMode::Synchronous => self
                .purge(&selection, trigger)
                .await
                .map(Dispatch::Completed),
            ExecutionMode::Detached => self.background.spawn(selection, trigger),
        }
    }

    /// Detached purges still running
    pub fn in_flight(&self) -> usize {
        self.background.in_flight()
    }

    /// Report of a finished detached purge started through this handle
    pub fn take_detached_report(&self, id: Uuid) -> Option<PurgeReport> {
        self.background.take_finished(id)
    }

    /// Wait for all detached purges. Call before the process exits.
    pub async fn shutdown(&self) {
        self.background.shutdown().await;
    }

    /// Hand the edge cache a purge mechanism supplied by the host
    pub fn register_edge_hook(&self, hook: Arc<dyn PurgeHook>) -> bool {
        self.registry.register_edge_hook(hook)
    }

    pub fn clear_edge_hook(&self) {
        self.registry.clear_edge_hook();
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }
}
