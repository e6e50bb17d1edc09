//! Score-sync collaborator client
//!
//! Contract: `POST {base}/calls/{callId}/score` with
//! `{callId, newScore, reason}`. A successful response means the caller
//! should adopt `newScore` as the stored baseline.

use super::{REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::sync::ScoreSink;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Score-sync client errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// One score write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSyncRequest {
    pub call_id: Uuid,
    pub new_score: u32,
    pub reason: String,
}

/// Acknowledgement body; collaborators that return an empty 2xx are
/// treated as successful
#[derive(Debug, Deserialize)]
struct SyncAck {
    success: bool,
}

/// HTTP client for the score-sync collaborator
pub struct ScoreSyncClient {
    http: reqwest::Client,
    base_url: String,
}

impl ScoreSyncClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post_score(&self, request: &ScoreSyncRequest) -> Result<(), SyncError> {
        let url = format!("{}/calls/{}/score", self.base_url, request.call_id);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api(status.as_u16(), body));
        }

        let ack = response
            .json::<SyncAck>()
            .await
            .unwrap_or(SyncAck { success: true });
        if !ack.success {
            return Err(SyncError::Api(status.as_u16(), "write rejected".to_string()));
        }

        tracing::debug!(call_id = %request.call_id, new_score = request.new_score, "score synced");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ScoreSink for ScoreSyncClient {
    async fn sync_score(&self, request: &ScoreSyncRequest) -> Result<(), SyncError> {
        self.post_score(request).await
    }
}
