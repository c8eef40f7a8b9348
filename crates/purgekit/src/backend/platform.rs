//! # CDN Platform Optimization
//!
//! The CDN's optimization layer has no invalidation call of its own; purging
//! it means purging the CDN cache. It shares the CDN adapter's credentials and
//! adds a local on/off flag.

use std::sync::Arc;

use async_trait::async_trait;

use super::adapter::BackendAdapter;
use super::cdn::CdnCacheAdapter;
use super::types::{BackendKind, BackendState, BackendStatus, FailureKind, PurgeOutcome};

#[derive(Debug)]
pub struct PlatformOptimizationAdapter {
    cdn: Arc<CdnCacheAdapter>,
    enabled: bool,
}

impl PlatformOptimizationAdapter {
    pub fn new(cdn: Arc<CdnCacheAdapter>, enabled: bool) -> Self {
        Self { cdn, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl BackendAdapter for PlatformOptimizationAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::CdnPlatformOptimization
    }

    async fn status(&self) -> BackendStatus {
        let kind = self.kind();
        if !self.cdn.is_configured() {
            return BackendStatus::not_configured(kind, self.cdn.missing_credentials_detail());
        }
        if !self.enabled {
            return BackendStatus::new(
                kind,
                BackendState::Disabled,
                "CDN credentials present but platform optimization is switched off",
            );
        }
        BackendStatus::active(kind, "Platform optimization enabled; purged with the CDN zone")
            .with_mechanism("api")
    }

    async fn purge(&self) -> PurgeOutcome {
        let kind = self.kind();
        if !self.cdn.is_configured() {
            return PurgeOutcome::failure(
                kind,
                FailureKind::NotConfigured,
                self.cdn.missing_credentials_detail(),
            );
        }

        let delegated = self.cdn.purge().await;
        match delegated.failure {
            None => PurgeOutcome::success(
                kind,
                "Optimized pages cleared by purging the CDN zone",
            ),
            Some(failure) => PurgeOutcome::failure(
                kind,
                failure,
                format!("Platform optimization purge failed: {}", delegated.message),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::CdnCredentials;
    use crate::test_utils::{RecordingTransport, test_credentials};

    fn adapter(
        credentials: CdnCredentials,
        enabled: bool,
        transport: Arc<RecordingTransport>,
    ) -> PlatformOptimizationAdapter {
        let cdn = Arc::new(CdnCacheAdapter::new(credentials, transport));
        PlatformOptimizationAdapter::new(cdn, enabled)
    }

    #[tokio::test]
    async fn test_flag_off_with_credentials_is_disabled() {
        let adapter = adapter(test_credentials(), false, Arc::new(RecordingTransport::succeeding()));
        assert_eq!(adapter.status().await.state, BackendState::Disabled);
    }

    #[tokio::test]
    async fn test_missing_credentials_win_over_flag() {
        let adapter = adapter(
            CdnCredentials::default(),
            true,
            Arc::new(RecordingTransport::succeeding()),
        );
        assert_eq!(adapter.status().await.state, BackendState::NotConfigured);
    }

    #[tokio::test]
    async fn test_enabled_with_credentials_is_active() {
        let adapter = adapter(test_credentials(), true, Arc::new(RecordingTransport::succeeding()));
        assert_eq!(adapter.status().await.state, BackendState::Active);
    }

    #[tokio::test]
    async fn test_purge_delegates_to_cdn() {
        let transport = Arc::new(RecordingTransport::succeeding());
        let adapter = adapter(test_credentials(), true, transport.clone());

        let outcome = adapter.purge().await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.kind, BackendKind::CdnPlatformOptimization);
        assert!(outcome.message.contains("CDN zone"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_purge_inherits_cdn_failure() {
        let transport = Arc::new(RecordingTransport::rejecting("invalid zone"));
        let adapter = adapter(test_credentials(), true, transport);

        let outcome = adapter.purge().await;
        assert_eq!(outcome.failure, Some(FailureKind::Logical));
        assert!(outcome.message.starts_with("Platform optimization purge failed"));
        assert!(outcome.message.contains("invalid zone"));
    }

    #[tokio::test]
    async fn test_purge_without_credentials_makes_no_call() {
        let transport = Arc::new(RecordingTransport::succeeding());
        let adapter = adapter(CdnCredentials::default(), true, transport.clone());

        let outcome = adapter.purge().await;
        assert_eq!(outcome.failure, Some(FailureKind::NotConfigured));
        assert_eq!(transport.calls(), 0);
    }
}
