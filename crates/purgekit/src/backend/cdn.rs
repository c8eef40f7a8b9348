//! # CDN Cache
//!
//! Status is a credentials check only. A purge sends "purge everything" for
//! the configured zone and succeeds only when the API says so.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::adapter::BackendAdapter;
use super::types::{
    BackendKind, BackendStatus, DEFAULT_SUCCESS_MESSAGE, FailureKind, PurgeOutcome,
};
use crate::cdn::{CdnCredentials, CdnTransport, HttpCdnTransport};
use crate::config::{CdnConfig, TimeoutConfig};
use crate::error::TransportError;

pub struct CdnCacheAdapter {
    credentials: CdnCredentials,
    transport: Arc<dyn CdnTransport>,
    timeout: Duration,
}

impl CdnCacheAdapter {
    pub fn new(credentials: CdnCredentials, transport: Arc<dyn CdnTransport>) -> Self {
        Self {
            credentials,
            transport,
            timeout: TimeoutConfig::default().purge(),
        }
    }

    pub fn from_config(config: &CdnConfig, timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        let transport = HttpCdnTransport::from_config(config, timeouts.purge())?;
        Ok(Self {
            credentials: CdnCredentials::from_config(config),
            transport: Arc::new(transport),
            timeout: timeouts.purge(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn credentials(&self) -> &CdnCredentials {
        &self.credentials
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_complete()
    }

    pub(crate) fn missing_credentials_detail(&self) -> String {
        format!(
            "Missing CDN credentials: {}",
            self.credentials.missing().join(", ")
        )
    }
}

impl std::fmt::Debug for CdnCacheAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnCacheAdapter")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl BackendAdapter for CdnCacheAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::CdnCache
    }

    async fn status(&self) -> BackendStatus {
        if !self.is_configured() {
            return BackendStatus::not_configured(self.kind(), self.missing_credentials_detail());
        }
        BackendStatus::active(
            self.kind(),
            format!("Credentials configured for zone {}", self.credentials.zone_id),
        )
        .with_mechanism("api")
    }

    async fn purge(&self) -> PurgeOutcome {
        let kind = self.kind();

        if !self.is_configured() {
            return PurgeOutcome::failure(
                kind,
                FailureKind::NotConfigured,
                self.missing_credentials_detail(),
            );
        }

        let request = self.transport.purge_everything(&self.credentials);
        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(zone = %self.credentials.zone_id, error = %e, "CDN purge request failed");
                let failure = if e.is_timeout() {
                    FailureKind::Timeout
                } else {
                    FailureKind::Transport
                };
                return PurgeOutcome::failure(kind, failure, format!("CDN request failed: {e}"));
            }
            Err(_) => {
                return PurgeOutcome::failure(
                    kind,
                    FailureKind::Timeout,
                    format!("CDN did not answer within {:?}", self.timeout),
                );
            }
        };

        if response.success {
            info!(zone = %self.credentials.zone_id, "CDN cache purged");
            PurgeOutcome::success(kind, DEFAULT_SUCCESS_MESSAGE)
        } else {
            let reason = response.error_message();
            warn!(zone = %self.credentials.zone_id, %reason, "CDN rejected purge");
            PurgeOutcome::failure(kind, FailureKind::Logical, format!("CDN rejected purge: {reason}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendState;
    use crate::test_utils::{RecordingTransport, test_credentials};

    #[tokio::test]
    async fn test_blank_credentials_are_not_configured() {
        let transport = Arc::new(RecordingTransport::succeeding());
        let adapter = CdnCacheAdapter::new(
            CdnCredentials::new("ops@example.com", "", "zone"),
            transport.clone(),
        );

        let status = adapter.status().await;
        assert_eq!(status.state, BackendState::NotConfigured);
        assert!(status.detail.contains("api_key"));

        let outcome = adapter.purge().await;
        assert_eq!(outcome.failure, Some(FailureKind::NotConfigured));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_purge() {
        let transport = Arc::new(RecordingTransport::succeeding());
        let adapter = CdnCacheAdapter::new(test_credentials(), transport.clone());

        assert!(adapter.status().await.is_active());
        let outcome = adapter.purge().await;
        assert!(outcome.succeeded);
        assert!(outcome.is_bare_success());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_logical_failure_carries_provider_message() {
        let transport = Arc::new(RecordingTransport::rejecting("invalid zone"));
        let adapter = CdnCacheAdapter::new(test_credentials(), transport);

        let outcome = adapter.purge().await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(FailureKind::Logical));
        assert!(outcome.message.contains("invalid zone"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let adapter = CdnCacheAdapter::new(test_credentials(), Arc::new(RecordingTransport::unreachable()));

        let outcome = adapter.purge().await;
        assert_eq!(outcome.failure, Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let transport = RecordingTransport::succeeding().with_delay(Duration::from_secs(5));
        let adapter = CdnCacheAdapter::new(test_credentials(), Arc::new(transport))
            .with_timeout(Duration::from_millis(20));

        let outcome = adapter.purge().await;
        assert_eq!(outcome.failure, Some(FailureKind::Timeout));
    }
}
