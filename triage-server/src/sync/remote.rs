//! Remote record store

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SyncError;
use crate::models::ScreeningRecord;

/// Durable remote storage for screening records
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create or replace the record under its id
    ///
    /// Must be idempotent: repeating the call for the same record never
    /// produces a second remote copy.
    async fn upsert(&self, record: &ScreeningRecord) -> Result<(), SyncError>;
}

/// `PUT {base}/records/{id}` with the record as JSON
pub struct HttpRemoteStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let http_client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn record_url(&self, record: &ScreeningRecord) -> String {
        format!("{}/records/{}", self.base_url, record.id)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upsert(&self, record: &ScreeningRecord) -> Result<(), SyncError> {
        let url = self.record_url(record);
        let response = self.http_client.put(&url).json(record).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Remote(status.as_u16()));
        }

        tracing::debug!(record_id = %record.id, %url, "Record stored remotely");
        Ok(())
    }
}

/// Stand-in when no remote URL is configured
pub struct NoRemoteStore;

#[async_trait]
impl RemoteStore for NoRemoteStore {
    async fn upsert(&self, _record: &ScreeningRecord) -> Result<(), SyncError> {
        Err(SyncError::Unreachable("no remote store configured".to_string()))
    }
}
