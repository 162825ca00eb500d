use std::time::Duration;

use async_trait::async_trait;
use gossipview_core::GossipTarget;
use reqwest::{Client, Response};
use tracing::debug;

use crate::{GossipSource, ServerConfig, ServiceError};

/// Hard ceiling on a single request, body included.
pub const GOSSIP_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP implementation of [`GossipSource`].
///
/// `origin` is the dashboard host: it serves `/config` and the proxy
/// relay. Direct targets ignore it.
pub struct HttpService {
    origin: String,
    client: Client,
    timeout: Duration,
}

impl HttpService {
    pub fn new(origin: &str) -> Self {
        Self::with_timeout(origin, GOSSIP_TIMEOUT)
    }

    pub fn with_timeout(origin: &str, timeout: Duration) -> Self {
        let origin = origin.trim_end_matches('/').to_string();
        Self {
            origin,
            client: Client::new(),
            timeout,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `get_json` bounded by the configured timeout. Dropping the request
    /// future on expiry aborts the transfer.
    async fn get_json_bounded(&self, url: &str) -> Result<serde_json::Value, ServiceError> {
        match tokio::time::timeout(self.timeout, self.get_json(url)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.timeout)),
        }
    }

    async fn get(&self, url: &str) -> Result<Response, ServiceError> {
        let resp = self
            .client
            .get(url)
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(ServiceError::Status(status.as_u16()))
        }
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ServiceError> {
        let resp = self.get(url).await?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(format!("read body: {e}")))?;
        serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GossipSource for HttpService {
    async fn fetch_config(&self) -> Result<ServerConfig, ServiceError> {
        let value = self
            .get_json_bounded(&format!("{}/config", self.origin))
            .await?;
        serde_json::from_value(value).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn fetch_gossip(&self, target: &GossipTarget) -> Result<serde_json::Value, ServiceError> {
        let url = target.absolute(&self.origin);
        debug!(%url, "fetching gossip");
        self.get_json_bounded(&url).await
    }
}
