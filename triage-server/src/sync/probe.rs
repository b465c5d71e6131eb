//! Connectivity probes

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SyncError;

/// Lightweight reachability check run before every sync cycle
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// GET against a health URL; any non-5xx answer counts as online
pub struct HttpProbe {
    http_client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let http_client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.http_client.get(&self.url).send().await {
            Ok(response) => {
                let reachable = !response.status().is_server_error();
                tracing::debug!(url = %self.url, status = %response.status(), reachable, "Connectivity probe");
                reachable
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Connectivity probe failed");
                false
            }
        }
    }
}

/// Probe for deployments with no remote store configured
pub struct OfflineProbe;

#[async_trait]
impl ConnectivityProbe for OfflineProbe {
    async fn is_reachable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_probe_never_reachable() {
        assert!(!OfflineProbe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_http_probe_unreachable_host() {
        // Port 9 (discard) on localhost is almost never listening
        let probe = HttpProbe::new("http://127.0.0.1:9/health", Duration::from_millis(500)).unwrap();
        assert!(!probe.is_reachable().await);
    }
}
