//! # Purgekit Engine
//!
//! Purge orchestration and status reconciliation for a site fronted by
//! several independent caches: an edge page cache, an object cache, a CDN
//! cache and the CDN's platform-optimization layer.
//!
//! ## Features
//!
//! - One status view across all backends, each derived from the backend's own signal
//! - "Purge everything" over any selection of backends with per-backend fault isolation
//! - A single human readable report per run, persisted as the last result
//! - Synchronous and detached execution, with detached runs awaited on shutdown
//! - Redis-protocol stores (feature `redis`) and an in-process store for tests
//!
//! ```no_run
//! use purgekit_engine::{CacheControl, PurgeConfig, TriggerSource};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let control = CacheControl::from_config(&PurgeConfig::default())?;
//! let report = control.purge_all(TriggerSource::Manual).await?;
//! println!("{}", report.summary_message);
//! control.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cdn;
pub mod config;
pub mod control;
pub mod error;
pub mod execution;
pub mod orchestrator;
pub mod reconciler;
pub mod registry;
pub mod report;
pub mod result_store;
pub mod selection;
pub mod store;
pub mod test_utils;

pub use backend::{
    BackendAdapter, BackendKind, BackendState, BackendStatus, BoxError, DEFAULT_SUCCESS_MESSAGE,
    FailureKind, PurgeHook, PurgeOutcome,
};
pub use config::{
    CdnConfig, EdgeCacheMode, EdgeConfig, ObjectCacheConfig, PurgeConfig, ResultStoreConfig,
    StoreConfig, TimeoutConfig,
};
pub use control::CacheControl;
pub use error::{ConfigError, PurgeError, ResultStoreError, SelectionError, StoreError, TransportError};
pub use execution::{BackgroundPurger, Dispatch, ExecutionMode};
pub use orchestrator::PurgeOrchestrator;
pub use reconciler::StatusReconciler;
pub use registry::AdapterRegistry;
pub use report::{PurgeReport, StatusSnapshot, TriggerSource};
pub use result_store::{FileResultStore, MemoryResultStore, ResultStore};
pub use selection::Selection;
