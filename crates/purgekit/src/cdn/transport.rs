use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::types::{CdnApiResponse, CdnCredentials};
use crate::config::CdnConfig;
use crate::error::TransportError;

/// Capability to issue the CDN's "purge everything" call
#[async_trait]
pub trait CdnTransport: Send + Sync {
    /// Send the purge request and return the parsed API envelope.
    ///
    /// An `Ok` response may still carry `success == false`; interpreting it is
    /// up to the caller.
    async fn purge_everything(
        &self,
        credentials: &CdnCredentials,
    ) -> Result<CdnApiResponse, TransportError>;
}

/// Create a reqwest Client for the CDN API
pub fn create_client(config: &CdnConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .pool_max_idle_per_host(2)
        .build()
}

/// [`CdnTransport`] over HTTPS
#[derive(Debug, Clone)]
pub struct HttpCdnTransport {
    client: Client,
    api_base: Url,
}

impl HttpCdnTransport {
    pub fn new(client: Client, api_base: &str) -> Result<Self, TransportError> {
        // Url::join drops the last path segment unless the base ends with '/'
        let api_base = if api_base.ends_with('/') {
            Url::parse(api_base)?
        } else {
            Url::parse(&format!("{api_base}/"))?
        };
        Ok(Self { client, api_base })
    }

    pub fn from_config(config: &CdnConfig, timeout: Duration) -> Result<Self, TransportError> {
        let client = create_client(config, timeout)?;
        Self::new(client, &config.api_base)
    }

    /// Endpoint that invalidates a zone's cache
    pub fn purge_url(&self, zone_id: &str) -> Result<Url, TransportError> {
        Ok(self.api_base.join(&format!("zones/{zone_id}/purge_cache"))?)
    }
}

#[async_trait]
impl CdnTransport for HttpCdnTransport {
    async fn purge_everything(
        &self,
        credentials: &CdnCredentials,
    ) -> Result<CdnApiResponse, TransportError> {
        let url = self.purge_url(&credentials.zone_id)?;
        debug!(%url, "Sending purge-everything request");

        let response = self
            .client
            .post(url)
            .header("X-Auth-Email", &credentials.email)
            .header("X-Auth-Key", &credentials.api_key)
            .json(&serde_json::json!({ "purge_everything": true }))
            .send()
            .await?;

        // Failures come back as 4xx with the same envelope, so the body is
        // parsed whatever the status
        let status = response.status();
        let body = response.bytes().await?;

        serde_json::from_slice::<CdnApiResponse>(&body).map_err(|e| {
            TransportError::InvalidResponse {
                status,
                reason: e.to_string(),
            }
        })
    }
}
