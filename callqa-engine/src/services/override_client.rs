//! Override-write collaborator client
//!
//! Contract: `POST {base}/overrides` with
//! `{callId, itemKey, overrideStatus, reviewedBy, notes}`. The engine
//! only writes through this API and reflects the override locally; the
//! persisted store is owned by the collaborator.

use super::{REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::types::OverrideStatus;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Override client errors
#[derive(Debug, Error)]
pub enum OverrideApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// One override write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideWriteRequest {
    pub call_id: Uuid,
    pub item_key: String,
    pub override_status: OverrideStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// HTTP client for the override-write collaborator
pub struct OverrideClient {
    http: reqwest::Client,
    base_url: String,
}

impl OverrideClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OverrideApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OverrideApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Submit one reviewer override. Item keys are lowercased to match
    /// the engine's override keying.
    pub async fn submit_override(
        &self,
        request: &OverrideWriteRequest,
    ) -> Result<(), OverrideApiError> {
        let normalized = OverrideWriteRequest {
            item_key: request.item_key.to_lowercase(),
            ..request.clone()
        };

        let url = format!("{}/overrides", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&normalized)
            .send()
            .await
            .map_err(|e| OverrideApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OverrideApiError::Api(status.as_u16(), body));
        }

        tracing::debug!(
            call_id = %normalized.call_id,
            item_key = %normalized.item_key,
            "override written"
        );
        Ok(())
    }
}
