//! # Execution Modes
//!
//! A purge either runs while the caller waits, or is handed to a background
//! task and acknowledged at once. Background runs are tracked so the process
//! can wait for them before exiting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PurgeError;
use crate::orchestrator::PurgeOrchestrator;
use crate::report::{PurgeReport, TriggerSource};
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Wait for the report
    #[default]
    Synchronous,
    /// Acknowledge immediately; the report lands in the result store later
    Detached,
}

/// What a dispatch hands back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Dispatch {
    Completed(PurgeReport),
    /// The run was accepted and continues in the background. `id` is the id
    /// its report will carry.
    Detached {
        id: Uuid,
        accepted_at: DateTime<Utc>,
    },
}

impl Dispatch {
    pub fn id(&self) -> Uuid {
        match self {
            Dispatch::Completed(report) => report.id,
            Dispatch::Detached { id, .. } => *id,
        }
    }

    pub fn report(&self) -> Option<&PurgeReport> {
        match self {
            Dispatch::Completed(report) => Some(report),
            Dispatch::Detached { .. } => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Dispatch::Detached { .. })
    }
}

/// Runs detached purges. Spawned runs are never cancelled;
/// [`BackgroundPurger::shutdown`] waits for all of them.
#[derive(Debug, Clone)]
pub struct BackgroundPurger {
    orchestrator: PurgeOrchestrator,
    tracker: TaskTracker,
    // Reports of finished runs, until their dispatcher collects them
    finished: Arc<Mutex<HashMap<Uuid, PurgeReport>>>,
}

impl BackgroundPurger {
    pub fn new(orchestrator: PurgeOrchestrator) -> Self {
        Self {
            orchestrator,
            tracker: TaskTracker::new(),
            finished: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Validate `selection` and start the run in the background. Must be called
    /// from within a tokio runtime.
    pub fn spawn(
        &self,
        selection: Selection,
        trigger: TriggerSource,
    ) -> Result<Dispatch, PurgeError> {
        self.orchestrator.validate(&selection)?;

        let id = Uuid::new_v4();
        let accepted_at = Utc::now();
        let orchestrator = self.orchestrator.clone();
        let finished = self.finished.clone();

        self.tracker.spawn(async move {
            let report = orchestrator.run(id, &selection, trigger).await;
            debug!(%id, overall_success = report.overall_success, "Detached purge finished");
            finished.lock().insert(id, report);
        });

        info!(%id, %trigger, in_flight = self.in_flight(), "Detached purge accepted");
        Ok(Dispatch::Detached { id, accepted_at })
    }

    /// Detached runs still going
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Report of the finished detached run `id`, independent of the result
    /// store. Each report can be taken once.
    pub fn take_finished(&self, id: Uuid) -> Option<PurgeReport> {
        self.finished.lock().remove(&id)
    }

    /// Wait for every in-flight run to finish
    pub async fn shutdown(&self) {
        self.tracker.close();
        if !self.tracker.is_empty() {
            info!(in_flight = self.in_flight(), "Waiting for detached purges to finish");
        }
        self.tracker.wait().await;
    }
}
