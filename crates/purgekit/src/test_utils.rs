use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{BackendAdapter, BackendKind, BackendStatus, FailureKind, PurgeOutcome};
use crate::cdn::{CdnApiError, CdnApiResponse, CdnCredentials, CdnTransport};
use crate::error::{ResultStoreError, StoreError, TransportError};
use crate::report::PurgeReport;
use crate::result_store::ResultStore;
use crate::store::{KeyValueStore, StoreResult};

/// Macro to initialize tracing for tests
///
/// Usage:
/// - `init_test_tracing!()` - uses DEBUG level (default)
/// - `init_test_tracing!(INFO)` - uses specified level
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        $crate::init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::$level)
            .with_test_writer()
            .try_init();
    };
}

/// Complete credentials for a zone nobody owns
pub fn test_credentials() -> CdnCredentials {
    CdnCredentials::new("ops@example.com", "test-api-key", "zone-0123")
}

enum FailureMode {
    Refused,
    Hanging,
}

/// A key/value store that never works
pub struct FailingStore {
    mode: FailureMode,
}

impl FailingStore {
    /// Every call fails the way a closed port does
    pub fn refused() -> Self {
        Self {
            mode: FailureMode::Refused,
        }
    }

    /// Every call waits forever
    pub fn hanging() -> Self {
        Self {
            mode: FailureMode::Hanging,
        }
    }

    async fn fail<T>(&self) -> StoreResult<T> {
        match self.mode {
            FailureMode::Refused => Err(StoreError::Connection(
                "Connection refused (os error 111)".to_string(),
            )),
            FailureMode::Hanging => std::future::pending().await,
        }
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.fail().await
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.fail().await
    }

    async fn delete_prefix(&self, _prefix: &str) -> StoreResult<u64> {
        self.fail().await
    }
}

enum Reply {
    Accept,
    Reject(String),
    Unreachable,
}

/// CDN transport that answers from a script and counts requests
pub struct RecordingTransport {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl RecordingTransport {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::with_reply(Reply::Accept)
    }

    /// The API answers `success: false` with `message`
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Reject(message.into()))
    }

    /// The request never gets a usable answer
    pub fn unreachable() -> Self {
        Self::with_reply(Reply::Unreachable)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of purge requests sent so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CdnTransport for RecordingTransport {
    async fn purge_everything(
        &self,
        _credentials: &CdnCredentials,
    ) -> Result<CdnApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Accept => Ok(CdnApiResponse {
                success: true,
                ..Default::default()
            }),
            Reply::Reject(message) => Ok(CdnApiResponse {
                success: false,
                errors: vec![CdnApiError {
                    code: Some(1049),
                    message: message.clone(),
                }],
                ..Default::default()
            }),
            Reply::Unreachable => Err(TransportError::InvalidResponse {
                status: reqwest::StatusCode::BAD_GATEWAY,
                reason: "upstream unreachable".to_string(),
            }),
        }
    }
}

enum Behavior {
    Return(PurgeOutcome),
    Panic,
}

/// Adapter with a fixed status and a fixed purge result
pub struct StaticAdapter {
    kind: BackendKind,
    status: BackendStatus,
    behavior: Behavior,
    delay: Option<Duration>,
    purges: Arc<AtomicUsize>,
}

impl StaticAdapter {
    fn build(kind: BackendKind, behavior: Behavior) -> Self {
        Self {
            kind,
            status: BackendStatus::active(kind, "static"),
            behavior,
            delay: None,
            purges: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Purges succeed with the default message
    pub fn succeeding(kind: BackendKind) -> Self {
        Self::build(kind, Behavior::Return(PurgeOutcome::success(kind, crate::DEFAULT_SUCCESS_MESSAGE)))
    }

    pub fn succeeding_with(kind: BackendKind, message: impl Into<String>) -> Self {
        Self::build(kind, Behavior::Return(PurgeOutcome::success(kind, message)))
    }

    pub fn failing(kind: BackendKind, failure: FailureKind, message: impl Into<String>) -> Self {
        Self::build(kind, Behavior::Return(PurgeOutcome::failure(kind, failure, message)))
    }

    /// Purges panic
    pub fn panicking(kind: BackendKind) -> Self {
        Self::build(kind, Behavior::Panic)
    }

    pub fn with_status(mut self, status: BackendStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared counter of purge calls, readable after the adapter is moved into a registry
    pub fn purge_counter(&self) -> Arc<AtomicUsize> {
        self.purges.clone()
    }
}

#[async_trait]
impl BackendAdapter for StaticAdapter {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn status(&self) -> BackendStatus {
        self.status.clone()
    }

    async fn purge(&self) -> PurgeOutcome {
        self.purges.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Return(outcome) => outcome.clone(),
            Behavior::Panic => panic!("{} adapter exploded", self.kind.label()),
        }
    }
}

/// A result store whose disk is gone: every call fails with an I/O error
#[derive(Debug, Default)]
pub struct FailingResultStore;

impl FailingResultStore {
    pub fn new() -> Self {
        Self
    }

    fn error() -> ResultStoreError {
        ResultStoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only file system",
        ))
    }
}

#[async_trait]
impl ResultStore for FailingResultStore {
    async fn save(&self, _report: &PurgeReport) -> Result<(), ResultStoreError> {
        Err(Self::error())
    }

    async fn load(&self) -> Result<Option<PurgeReport>, ResultStoreError> {
        Err(Self::error())
    }

    async fn clear(&self) -> Result<(), ResultStoreError> {
        Err(Self::error())
    }
}
