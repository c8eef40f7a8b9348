//! # Backend Types
//!
//! Common types shared by every backend adapter: the backend identity, the
//! normalized status model and the outcome of a single purge attempt.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

/// Identity of a cache backend.
///
/// The declaration order is the canonical order used for purge runs and
/// report formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Reverse-proxy page cache in front of the application
    #[cfg_attr(feature = "clap", value(name = "edge"))]
    EdgeCache,
    /// Key/value store holding computed application data
    #[cfg_attr(feature = "clap", value(name = "object"))]
    ObjectCache,
    /// The CDN's own edge cache
    #[cfg_attr(feature = "clap", value(name = "cdn"))]
    CdnCache,
    /// The CDN's platform-optimization layer
    #[cfg_attr(feature = "clap", value(name = "platform"))]
    CdnPlatformOptimization,
}

impl BackendKind {
    /// All backends in canonical order
    pub const ALL: [BackendKind; 4] = [
        BackendKind::EdgeCache,
        BackendKind::ObjectCache,
        BackendKind::CdnCache,
        BackendKind::CdnPlatformOptimization,
    ];

    /// Short identifier used on the command line and in config files
    pub fn slug(&self) -> &'static str {
        match self {
            BackendKind::EdgeCache => "edge",
            BackendKind::ObjectCache => "object",
            BackendKind::CdnCache => "cdn",
            BackendKind::CdnPlatformOptimization => "platform",
        }
    }

    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::EdgeCache => "Edge cache",
            BackendKind::ObjectCache => "Object cache",
            BackendKind::CdnCache => "CDN cache",
            BackendKind::CdnPlatformOptimization => "CDN platform optimization",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackendKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == needle)
            .ok_or_else(|| SelectionError::UnknownBackend(s.to_string()))
    }
}

/// Normalized state of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendState {
    /// Configured, prerequisites present and (where probed) reachable
    Active,
    /// Configured, but a local prerequisite is missing
    Inactive,
    /// Configured, but switched off locally
    Disabled,
    /// No usable configuration; there is no way to purge this backend
    NotConfigured,
    /// Configured, but the live backend did not answer
    NotConnected,
    /// Status could not be determined
    Error,
}

impl BackendState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Active => "active",
            BackendState::Inactive => "inactive",
            BackendState::Disabled => "disabled",
            BackendState::NotConfigured => "not configured",
            BackendState::NotConnected => "not connected",
            BackendState::Error => "error",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one backend at the time it was queried
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub kind: BackendKind,
    pub state: BackendState,
    /// Human readable explanation of the state
    pub detail: String,
    /// Which mechanism is in effect, e.g. `disk` or `redis`
    pub mechanism: Option<String>,
}

impl BackendStatus {
    pub fn new(kind: BackendKind, state: BackendState, detail: impl Into<String>) -> Self {
        Self {
            kind,
            state,
            detail: detail.into(),
            mechanism: None,
        }
    }

    pub fn active(kind: BackendKind, detail: impl Into<String>) -> Self {
        Self::new(kind, BackendState::Active, detail)
    }

    pub fn not_configured(kind: BackendKind, detail: impl Into<String>) -> Self {
        Self::new(kind, BackendState::NotConfigured, detail)
    }

    pub fn error(kind: BackendKind, detail: impl Into<String>) -> Self {
        Self::new(kind, BackendState::Error, detail)
    }

    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.mechanism = Some(mechanism.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == BackendState::Active
    }
}

/// Class of a failed purge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The backend has no usable configuration
    NotConfigured,
    /// A required local capability (client support, binary, drop-in) is absent
    Unavailable,
    /// The live backend could not be reached
    NotConnected,
    /// The network call failed below the HTTP layer
    Transport,
    /// The remote API answered but reported its own failure
    Logical,
    /// The call did not complete in time
    Timeout,
    /// Unexpected fault inside the adapter
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NotConfigured => "not configured",
            FailureKind::Unavailable => "unavailable",
            FailureKind::NotConnected => "not connected",
            FailureKind::Transport => "transport failure",
            FailureKind::Logical => "logical failure",
            FailureKind::Timeout => "timeout",
            FailureKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Message used for a success that carries no extra information
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Purged successfully";

/// Result of one purge attempt against one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    pub kind: BackendKind,
    pub succeeded: bool,
    pub message: String,
    /// Present iff the purge failed
    pub failure: Option<FailureKind>,
    /// Wall time spent on the attempt
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl PurgeOutcome {
    pub fn success(kind: BackendKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            succeeded: true,
            message: message.into(),
            failure: None,
            elapsed_ms: 0,
        }
    }

    pub fn failure(kind: BackendKind, failure: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            succeeded: false,
            message: message.into(),
            failure: Some(failure),
            elapsed_ms: 0,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = elapsed.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// A success whose message adds nothing beyond "it worked"
    pub fn is_bare_success(&self) -> bool {
        self.succeeded && (self.message.is_empty() || self.message == DEFAULT_SUCCESS_MESSAGE)
    }
}
