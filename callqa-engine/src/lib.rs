//! callqa-engine library interface
//!
//! The call-audit analysis engine: derives a weighted compliance
//! scorecard, per-item confidence, a position-normalized event timeline,
//! and a diarized transcript from one heterogeneous call record.
//!
//! All derivation is pure (`analysis::analyze_call`); the service shell
//! around it adds the collaborator clients and the debounced score sync.

pub mod analysis;
pub mod api;
pub mod autofail;
pub mod confidence;
pub mod diarization;
pub mod error;
pub mod normalizer;
pub mod overrides;
pub mod record;
pub mod scoring;
pub mod services;
pub mod sync;
pub mod timeline;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use crate::services::OverrideClient;
use crate::sync::ScoreSyncScheduler;
use axum::routing::{get, post};
use axum::Router;
use callqa_common::config::EngineParams;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Engine tuning parameters
    pub params: EngineParams,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Debounced score-sync scheduler, when a collaborator is configured
    pub sync: Option<Arc<ScoreSyncScheduler>>,
    /// Override-write collaborator, when configured
    pub override_api: Option<Arc<OverrideClient>>,
}

impl AppState {
    pub fn new(
        params: EngineParams,
        sync: Option<Arc<ScoreSyncScheduler>>,
        override_api: Option<Arc<OverrideClient>>,
    ) -> Self {
        Self {
            params,
            startup_time: Utc::now(),
            sync,
            override_api,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(api::analyze))
        .route("/overrides", post(api::submit_override))
        .route("/health", get(api::health))
        .with_state(state)
}
