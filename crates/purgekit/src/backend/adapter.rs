//! # Backend Adapter
//!
//! This module defines the trait every backend adapter implements.

use async_trait::async_trait;

use super::types::{BackendKind, BackendStatus, PurgeOutcome};

/// Status and purge for one cache backend.
///
/// Neither method fails: problems are reported as `BackendState::Error` or as
/// a failed [`PurgeOutcome`] carrying the reason. Network calls made by either
/// method are bounded by a timeout.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Which backend this adapter drives
    fn kind(&self) -> BackendKind;

    /// Derive the backend's current status. Cheap enough to call on every render.
    async fn status(&self) -> BackendStatus;

    /// Invalidate everything the backend holds. Purging an empty cache succeeds.
    async fn purge(&self) -> PurgeOutcome;
}
