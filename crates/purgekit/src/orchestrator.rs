//! # Purge Orchestrator
//!
//! Runs purges over a [`Selection`], isolates every adapter from the others,
//! folds the outcomes into a [`PurgeReport`] and records it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{BackendAdapter, BackendKind, FailureKind, PurgeOutcome};
use crate::config::TimeoutConfig;
use crate::error::PurgeError;
use crate::registry::AdapterRegistry;
use crate::report::{PurgeReport, TriggerSource};
use crate::result_store::ResultStore;
use crate::selection::Selection;

#[derive(Clone)]
pub struct PurgeOrchestrator {
    registry: Arc<AdapterRegistry>,
    results: Arc<dyn ResultStore>,
    adapter_timeout: Duration,
}

impl PurgeOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>, results: Arc<dyn ResultStore>) -> Self {
        Self {
            registry,
            results,
            adapter_timeout: TimeoutConfig::default().adapter(),
        }
    }

    /// Upper bound on a single adapter's purge, on top of the adapter's own
    /// network timeouts
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn result_store(&self) -> &Arc<dyn ResultStore> {
        &self.results
    }

    /// Check that every selected backend has an adapter
    pub fn validate(&self, selection: &Selection) -> Result<(), PurgeError> {
        match selection.iter().find(|kind| !self.registry.contains(*kind)) {
            Some(kind) => Err(PurgeError::Unregistered(kind)),
            None => Ok(()),
        }
    }

    /// Purge every selected backend and record the report.
    ///
    /// Backend failures never surface as `Err`; they are outcomes in the
    /// report. Only a selection naming an unregistered backend is rejected,
    /// and that happens before any adapter runs.
    pub async fn purge(
        &self,
        selection: &Selection,
        trigger: TriggerSource,
    ) -> Result<PurgeReport, PurgeError> {
        self.validate(selection)?;
        Ok(self.run(Uuid::new_v4(), selection, trigger).await)
    }

    pub async fn purge_all(&self, trigger: TriggerSource) -> Result<PurgeReport, PurgeError> {
        self.purge(&Selection::all(), trigger).await
    }

    /// Purge a single backend; no other adapter is touched
    pub async fn purge_backend(
        &self,
        kind: BackendKind,
        trigger: TriggerSource,
    ) -> Result<PurgeReport, PurgeError> {
        self.purge(&Selection::one(kind), trigger).await
    }

    /// The last recorded report. A store that cannot be read counts as empty.
    pub async fn last_report(&self) -> Option<PurgeReport> {
        match self.results.load().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Failed to read last purge report");
                None
            }
        }
    }

    /// Run an already validated selection under a preassigned id
    pub(crate) async fn run(
        &self,
        id: Uuid,
        selection: &Selection,
        trigger: TriggerSource,
    ) -> PurgeReport {
        debug!(%id, %trigger, selection = %selection, "Starting purge run");

        let runs = selection.iter().map(|kind| async move {
            match self.registry.get(kind) {
                Some(adapter) => self.guarded(kind, adapter.clone()).await,
                None => PurgeOutcome::failure(
                    kind,
                    FailureKind::NotConfigured,
                    "No adapter registered",
                ),
            }
        });
        let outcomes = join_all(runs).await;

        let report = PurgeReport::new(id, trigger, selection.kinds(), outcomes);

        for failed in report.failed_outcomes() {
            warn!(
                %id,
                backend = failed.kind.slug(),
                failure = ?failed.failure,
                message = %failed.message,
                "Backend purge failed"
            );
        }
        info!(
            %id,
            %trigger,
            overall_success = report.overall_success,
            purged = report.succeeded_kinds().len(),
            requested = report.requested_kinds.len(),
            "Purge run finished"
        );

        if let Err(e) = self.results.save(&report).await {
            warn!(%id, error = %e, "Failed to record purge report");
        }

        report
    }

    // One adapter, with panics and runaway calls turned into failed outcomes
    async fn guarded(&self, kind: BackendKind, adapter: Arc<dyn BackendAdapter>) -> PurgeOutcome {
        let started = Instant::now();

        let attempt = AssertUnwindSafe(adapter.purge()).catch_unwind();
        let outcome = match tokio::time::timeout(self.adapter_timeout, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(payload)) => {
                let reason = panic_message(payload.as_ref());
                warn!(backend = kind.slug(), %reason, "Adapter panicked during purge");
                PurgeOutcome::failure(
                    kind,
                    FailureKind::Internal,
                    format!("Internal error during purge: {reason}"),
                )
            }
            Err(_) => PurgeOutcome::failure(
                kind,
                FailureKind::Timeout,
                format!("Purge did not finish within {:?}", self.adapter_timeout),
            ),
        };

        debug!(
            backend = kind.slug(),
            succeeded = outcome.succeeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Adapter purge finished"
        );
        outcome.with_elapsed(started.elapsed())
    }
}

impl std::fmt::Debug for PurgeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurgeOrchestrator")
            .field("registry", &self.registry)
            .field("adapter_timeout", &self.adapter_timeout)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
