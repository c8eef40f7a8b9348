//! # Edge Cache
//!
//! The reverse-proxy page cache. Its status comes from configuration alone.
//! A purge tries, in order, a host-registered hook, removal of the cache
//! directory's contents and, in store mode, deleting keys from the store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use super::adapter::BackendAdapter;
use super::types::{BackendKind, BackendState, BackendStatus, FailureKind, PurgeOutcome};
use crate::config::{EdgeCacheMode, EdgeConfig, TimeoutConfig};
use crate::store::{self, StoreHandle};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Externally registered purge mechanism for the edge cache
#[async_trait]
pub trait PurgeHook: Send + Sync {
    async fn invoke(&self) -> Result<(), BoxError>;
}

/// Plain closures run on the blocking pool, so the purge timeout still bounds
/// a hook that blocks. A timed out hook keeps running to completion.
#[async_trait]
impl<F> PurgeHook for F
where
    F: Fn() -> Result<(), BoxError> + Clone + Send + Sync + 'static,
{
    async fn invoke(&self) -> Result<(), BoxError> {
        let hook = self.clone();
        tokio::task::spawn_blocking(move || hook()).await?
    }
}

#[derive(Debug, Clone, Copy)]
enum PurgeMethod {
    Hook,
    Files,
    Store,
}

impl PurgeMethod {
    const ORDER: [PurgeMethod; 3] = [PurgeMethod::Hook, PurgeMethod::Files, PurgeMethod::Store];
}

/// Result of trying one purge method
enum Attempt {
    Done(String),
    /// The method does not apply to this setup
    Inapplicable(String),
    Failed(FailureKind, String),
}

pub struct EdgeCacheAdapter {
    mode: EdgeCacheMode,
    cache_dir: PathBuf,
    store: StoreHandle,
    prefix: Option<String>,
    hook: RwLock<Option<Arc<dyn PurgeHook>>>,
    timeout: Duration,
}

impl EdgeCacheAdapter {
    pub fn new(mode: EdgeCacheMode, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            cache_dir: cache_dir.into(),
            store: StoreHandle::Missing,
            prefix: None,
            hook: RwLock::new(None),
            timeout: TimeoutConfig::default().purge(),
        }
    }

    pub fn from_config(config: &EdgeConfig, timeouts: &TimeoutConfig) -> Self {
        let store = if config.mode == EdgeCacheMode::Store {
            StoreHandle::from_url(&config.store.url)
        } else {
            StoreHandle::Missing
        };

        Self {
            mode: config.mode,
            cache_dir: config.cache_dir.clone(),
            store,
            prefix: config.store.effective_prefix().map(str::to_owned),
            hook: RwLock::new(None),
            timeout: timeouts.purge(),
        }
    }

    /// Use `store` for store mode, purging only keys under `prefix` when given
    pub fn with_store(mut self, store: impl Into<StoreHandle>, prefix: Option<String>) -> Self {
        self.store = store.into();
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn with_hook(self, hook: Arc<dyn PurgeHook>) -> Self {
        self.register_hook(hook);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register the host's purge mechanism, replacing any previous one
    pub fn register_hook(&self, hook: Arc<dyn PurgeHook>) {
        *self.hook.write() = Some(hook);
    }

    pub fn clear_hook(&self) {
        *self.hook.write() = None;
    }

    pub fn has_hook(&self) -> bool {
        self.hook.read().is_some()
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn config_status(&self, dir_exists: bool) -> BackendStatus {
        let kind = BackendKind::EdgeCache;
        match self.mode {
            EdgeCacheMode::Disk if dir_exists => BackendStatus::active(
                kind,
                format!("Page cache directory {} is present", self.cache_dir.display()),
            )
            .with_mechanism("disk"),
            EdgeCacheMode::Disk => BackendStatus::new(
                kind,
                BackendState::Inactive,
                format!("Page cache directory {} not found", self.cache_dir.display()),
            )
            .with_mechanism("disk"),
            EdgeCacheMode::Store => match &self.store {
                StoreHandle::Missing => {
                    BackendStatus::not_configured(kind, "Store mode selected but no store URL is set")
                }
                StoreHandle::Failed(e) => {
                    let state = if e.failure_kind() == FailureKind::Unavailable {
                        BackendState::Inactive
                    } else {
                        BackendState::Error
                    };
                    BackendStatus::new(kind, state, e.to_string())
                }
                StoreHandle::Ready(store) => {
                    let scope = match &self.prefix {
                        Some(prefix) => format!("keys prefixed '{prefix}'"),
                        None => "whole database".to_string(),
                    };
                    BackendStatus::active(kind, format!("Pages kept in {} store ({scope})", store.name()))
                        .with_mechanism(store.name())
                }
            },
            EdgeCacheMode::Off => BackendStatus::not_configured(kind, "Edge caching is turned off"),
        }
    }

    async fn attempt(&self, method: PurgeMethod) -> Attempt {
        match method {
            PurgeMethod::Hook => self.purge_via_hook().await,
            PurgeMethod::Files => self.purge_files().await,
            PurgeMethod::Store => self.purge_store().await,
        }
    }

    async fn purge_via_hook(&self) -> Attempt {
        // Clone out of the lock; the guard must not be held across the await
        let hook = self.hook.read().clone();
        let Some(hook) = hook else {
            return Attempt::Inapplicable("no purge hook registered".to_string());
        };

        match tokio::time::timeout(self.timeout, hook.invoke()).await {
            Ok(Ok(())) => Attempt::Done("Purged via registered purge hook".to_string()),
            Ok(Err(e)) => Attempt::Failed(FailureKind::Internal, format!("purge hook failed: {e}")),
            Err(_) => Attempt::Failed(
                FailureKind::Timeout,
                format!("purge hook did not finish within {:?}", self.timeout),
            ),
        }
    }

    /// Off mode, or store mode without a store, leaves nothing to purge but a hook
    fn is_configured(&self) -> bool {
        match self.mode {
            EdgeCacheMode::Disk => true,
            EdgeCacheMode::Store => !matches!(self.store, StoreHandle::Missing),
            EdgeCacheMode::Off => false,
        }
    }

    async fn purge_files(&self) -> Attempt {
        if !self.is_configured() {
            return Attempt::Inapplicable("edge cache is not configured".to_string());
        }

        let dir = &self.cache_dir;
        match fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Attempt::Inapplicable(format!("{} is not a directory", dir.display()));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Attempt::Inapplicable(format!("{} not found", dir.display()));
            }
            Err(e) => {
                return Attempt::Failed(
                    FailureKind::Unavailable,
                    format!("cannot access {}: {e}", dir.display()),
                );
            }
        }

        match remove_dir_contents(dir).await {
            Ok(0) => Attempt::Done(format!("Cache directory {} was already empty", dir.display())),
            Ok(count) => Attempt::Done(format!("Removed {count} entries from {}", dir.display())),
            Err(e) => Attempt::Failed(
                FailureKind::Internal,
                format!("failed to clear {}: {e}", dir.display()),
            ),
        }
    }

    async fn purge_store(&self) -> Attempt {
        if self.mode != EdgeCacheMode::Store {
            return Attempt::Inapplicable("not in store mode".to_string());
        }

        let store = match &self.store {
            StoreHandle::Missing => {
                return Attempt::Inapplicable("no store URL configured".to_string());
            }
            StoreHandle::Failed(e) => return Attempt::Failed(e.failure_kind(), e.to_string()),
            StoreHandle::Ready(store) => store,
        };

        match &self.prefix {
            Some(prefix) => match store::bounded(self.timeout, store.delete_prefix(prefix)).await {
                Ok(count) => Attempt::Done(format!(
                    "Deleted {count} keys prefixed '{prefix}' from {} store",
                    store.name()
                )),
                Err(e) => Attempt::Failed(e.failure_kind(), format!("store purge failed: {e}")),
            },
            None => match store::bounded(self.timeout, store.flush_all()).await {
                Ok(()) => Attempt::Done(format!("Flushed {} store", store.name())),
                Err(e) => Attempt::Failed(e.failure_kind(), format!("store flush failed: {e}")),
            },
        }
    }
}

impl fmt::Debug for EdgeCacheAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeCacheAdapter")
            .field("mode", &self.mode)
            .field("cache_dir", &self.cache_dir)
            .field("store", &self.store)
            .field("prefix", &self.prefix)
            .field("has_hook", &self.has_hook())
            .finish()
    }
}

#[async_trait]
impl BackendAdapter for EdgeCacheAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::EdgeCache
    }

    async fn status(&self) -> BackendStatus {
        let dir_exists = fs::metadata(&self.cache_dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        let status = self.config_status(dir_exists);

        // A hook is a way to purge even when nothing else is set up
        if self.has_hook()
            && matches!(status.state, BackendState::NotConfigured | BackendState::Inactive)
        {
            return BackendStatus::active(
                BackendKind::EdgeCache,
                format!("Purge hook registered ({})", status.detail),
            )
            .with_mechanism("hook");
        }
        status
    }

    async fn purge(&self) -> PurgeOutcome {
        let kind = BackendKind::EdgeCache;
        let mut failures: Vec<(FailureKind, String)> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();

        for method in PurgeMethod::ORDER {
            match self.attempt(method).await {
                Attempt::Done(message) => {
                    debug!(?method, %message, "Edge cache purged");
                    let message = if failures.is_empty() {
                        message
                    } else {
                        let earlier: Vec<&str> = failures.iter().map(|(_, m)| m.as_str()).collect();
                        format!("{message} (after: {})", earlier.join("; "))
                    };
                    return PurgeOutcome::success(kind, message);
                }
                Attempt::Inapplicable(reason) => {
                    debug!(?method, %reason, "Edge purge method not applicable");
                    skipped.push(reason);
                }
                Attempt::Failed(failure, message) => {
                    warn!(?method, %message, "Edge purge method failed, trying next");
                    failures.push((failure, message));
                }
            }
        }

        match failures.last() {
            Some((failure, _)) => {
                let messages: Vec<&str> = failures.iter().map(|(_, m)| m.as_str()).collect();
                PurgeOutcome::failure(kind, *failure, messages.join("; "))
            }
            None => PurgeOutcome::failure(
                kind,
                FailureKind::NotConfigured,
                format!("No purge method available: {}", skipped.join(", ")),
            ),
        }
    }
}

/// Remove everything inside `dir`, keeping `dir` itself. Returns the number of
/// top-level entries removed.
async fn remove_dir_contents(dir: &Path) -> io::Result<usize> {
    let mut entries = fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let result = if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };

        match result {
            Ok(()) => removed += 1,
            // Another purge got there first
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to remove cache entry");
                return Err(e);
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::FailingStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn populated_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/0f")).unwrap();
        std::fs::write(dir.path().join("a/0f/8d1e"), b"<html>").unwrap();
        std::fs::write(dir.path().join("b2c1"), b"<html>").unwrap();
        dir
    }

    fn counting_hook(calls: Arc<AtomicUsize>, fail: bool) -> Arc<dyn PurgeHook> {
        Arc::new(move || -> Result<(), BoxError> {
            calls.fetch_add(1, Ordering::SeqCst);
            if fail { Err("host purge exploded".into()) } else { Ok(()) }
        })
    }

    #[tokio::test]
    async fn test_disk_status_follows_directory() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Disk, dir.path());
        let status = adapter.status().await;
        assert_eq!(status.state, BackendState::Active);
        assert_eq!(status.mechanism.as_deref(), Some("disk"));

        let missing = EdgeCacheAdapter::new(EdgeCacheMode::Disk, dir.path().join("nope"));
        assert_eq!(missing.status().await.state, BackendState::Inactive);
    }

    #[tokio::test]
    async fn test_store_status_needs_connection_parameters() {
        let config = EdgeConfig {
            mode: EdgeCacheMode::Store,
            ..Default::default()
        };
        let adapter = EdgeCacheAdapter::from_config(&config, &TimeoutConfig::default());
        assert_eq!(adapter.status().await.state, BackendState::NotConfigured);

        let adapter = adapter.with_store(
            Arc::new(MemoryStore::new()) as Arc<dyn crate::store::KeyValueStore>,
            Some("page:".into()),
        );
        let status = adapter.status().await;
        assert_eq!(status.state, BackendState::Active);
        assert!(status.detail.contains("page:"));
    }

    #[tokio::test]
    async fn test_hook_makes_unconfigured_cache_active() {
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Off, "/nonexistent/edge-cache");
        assert_eq!(adapter.status().await.state, BackendState::NotConfigured);

        adapter.register_hook(counting_hook(Arc::new(AtomicUsize::new(0)), false));
        let status = adapter.status().await;
        assert_eq!(status.state, BackendState::Active);
        assert_eq!(status.mechanism.as_deref(), Some("hook"));

        adapter.clear_hook();
        assert_eq!(adapter.status().await.state, BackendState::NotConfigured);
    }

    #[tokio::test]
    async fn test_hook_wins_over_file_removal() {
        let dir = populated_dir();
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Disk, dir.path())
            .with_hook(counting_hook(calls.clone(), false));

        let outcome = adapter.purge().await;

        assert!(outcome.succeeded);
        assert!(outcome.message.contains("hook"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Files untouched because the hook already handled it
        assert!(dir.path().join("b2c1").exists());
    }

    #[tokio::test]
    async fn test_failed_hook_falls_back_to_files() {
        let dir = populated_dir();
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Disk, dir.path())
            .with_hook(counting_hook(Arc::new(AtomicUsize::new(0)), true));

        let outcome = adapter.purge().await;

        assert!(outcome.succeeded, "{outcome:?}");
        assert!(outcome.message.contains("Removed 2 entries"));
        assert!(outcome.message.contains("host purge exploded"));
        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_purging_empty_directory_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Disk, dir.path());

        let outcome = adapter.purge().await;
        assert!(outcome.succeeded);
        assert!(outcome.message.contains("already empty"));
    }

    #[tokio::test]
    async fn test_store_mode_deletes_prefixed_keys() {
        let store = Arc::new(MemoryStore::new());
        store.insert("nginx-cache:/", "home").await;
        store.insert("nginx-cache:/shop", "shop").await;
        store.insert("other", "keep").await;

        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Store, "/nonexistent/edge-cache")
            .with_store(
                store.clone() as Arc<dyn crate::store::KeyValueStore>,
                Some("nginx-cache:".into()),
            );

        let outcome = adapter.purge().await;

        assert!(outcome.succeeded, "{outcome:?}");
        assert!(outcome.message.contains("Deleted 2 keys"));
        assert!(store.contains("other"));
        assert!(!store.contains("nginx-cache:/shop"));
    }

    #[tokio::test]
    async fn test_store_mode_without_prefix_flushes() {
        let store = Arc::new(MemoryStore::new());
        store.insert("a", "1").await;

        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Store, "/nonexistent/edge-cache")
            .with_store(store.clone() as Arc<dyn crate::store::KeyValueStore>, None);

        let outcome = adapter.purge().await;
        assert!(outcome.succeeded);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_not_connected() {
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Store, "/nonexistent/edge-cache")
            .with_store(Arc::new(FailingStore::refused()) as Arc<dyn crate::store::KeyValueStore>, None);

        let outcome = adapter.purge().await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(FailureKind::NotConnected));
        assert!(outcome.message.contains("Connection refused"));
    }

    #[tokio::test]
    async fn test_off_mode_leaves_cache_directory_alone() {
        let dir = populated_dir();
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Off, dir.path());
        assert_eq!(adapter.status().await.state, BackendState::NotConfigured);

        let outcome = adapter.purge().await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(FailureKind::NotConfigured));
        assert!(dir.path().join("b2c1").exists());
        assert!(dir.path().join("a/0f/8d1e").exists());
    }

    #[tokio::test]
    async fn test_store_mode_without_url_leaves_cache_directory_alone() {
        let dir = populated_dir();
        let config = EdgeConfig {
            mode: EdgeCacheMode::Store,
            cache_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let adapter = EdgeCacheAdapter::from_config(&config, &TimeoutConfig::default());

        let outcome = adapter.purge().await;

        assert_eq!(outcome.failure, Some(FailureKind::NotConfigured));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_blocking_hook_is_bounded_by_timeout() {
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Off, "/nonexistent/edge-cache")
            .with_timeout(Duration::from_millis(50))
            .with_hook(Arc::new(|| -> Result<(), BoxError> {
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            }));

        let started = std::time::Instant::now();
        let outcome = adapter.purge().await;

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(outcome.failure, Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn test_nothing_applicable_is_not_configured() {
        let adapter = EdgeCacheAdapter::new(EdgeCacheMode::Off, "/nonexistent/edge-cache");

        let outcome = adapter.purge().await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(FailureKind::NotConfigured));
        assert!(outcome.message.contains("no purge hook registered"));
    }
}
