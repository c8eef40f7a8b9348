//! # Result Store
//!
//! Keeps the most recent [`PurgeReport`]. One slot, last write wins, no
//! expiry: readers judge freshness from the report's timestamp.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::ResultStoreConfig;
use crate::error::ResultStoreError;
use crate::report::PurgeReport;

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Replace the stored report
    async fn save(&self, report: &PurgeReport) -> Result<(), ResultStoreError>;

    /// The last saved report, if any
    async fn load(&self) -> Result<Option<PurgeReport>, ResultStoreError>;

    async fn clear(&self) -> Result<(), ResultStoreError>;
}

/// Pick the store described by `config`: a JSON file when a path is set,
/// process memory otherwise
pub fn from_config(config: &ResultStoreConfig) -> Arc<dyn ResultStore> {
    match &config.path {
        Some(path) => Arc::new(FileResultStore::new(path.clone())),
        None => Arc::new(MemoryResultStore::new()),
    }
}

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    slot: RwLock<Option<PurgeReport>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read without going through the async trait
    pub fn latest(&self) -> Option<PurgeReport> {
        self.slot.read().clone()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn save(&self, report: &PurgeReport) -> Result<(), ResultStoreError> {
        *self.slot.write() = Some(report.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PurgeReport>, ResultStoreError> {
        Ok(self.latest())
    }

    async fn clear(&self) -> Result<(), ResultStoreError> {
        *self.slot.write() = None;
        Ok(())
    }
}

/// Report persisted as a JSON file so it survives restarts and can be read by
/// another process.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    path: PathBuf,
}

impl FileResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Unique per write so concurrent saves never share a temp file
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "last-purge.json".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn save(&self, report: &PurgeReport) -> Result<(), ResultStoreError> {
        let json = serde_json::to_vec_pretty(report)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers must never see a half-written report
        let temp = self.temp_path();
        tokio::fs::write(&temp, &json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), id = %report.id, "Saved purge report");
        Ok(())
    }

    async fn load(&self) -> Result<Option<PurgeReport>, ResultStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), ResultStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
