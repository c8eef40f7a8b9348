use crate::backend::{BackendKind, FailureKind};

/// Rejected selections. These are caller errors and are raised before any
/// backend is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Selection must name at least one backend")]
    EmptySelection,

    #[error("Unknown backend: {0} (expected one of: edge, object, cdn, platform)")]
    UnknownBackend(String),
}

/// Errors that escape a purge run. Backend failures never do; they are
/// reported inside the `PurgeReport`.
#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("No adapter registered for {0}")]
    Unregistered(BackendKind),
}

// Errors raised by key/value store clients
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store client support is unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Store command failed: {0}")]
    Command(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl StoreError {
    /// Failure class reported when this error ends a purge
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            StoreError::Unavailable(_) => FailureKind::Unavailable,
            StoreError::InvalidUrl(_) => FailureKind::NotConfigured,
            StoreError::Connection(_) => FailureKind::NotConnected,
            StoreError::Command(_) => FailureKind::Internal,
            StoreError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() || err.is_connection_dropped() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

// Errors raised by the CDN transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected response (status {status}): {reason}")]
    InvalidResponse {
        status: reqwest::StatusCode,
        reason: String,
    },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Http(e) if e.is_timeout())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResultStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode purge report: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to set up CDN transport: {0}")]
    Transport(#[from] TransportError),
}
