//! HTTP handlers for the analysis service
//!
//! The service surface is deliberately thin: one endpoint that derives a
//! full analysis from a posted call record, one that forwards a reviewer
//! override to the collaborator, and a health probe. No persistence, no
//! sessions — every analyze call is a fresh pure recompute.

use crate::analysis::analyze_call;
use crate::error::{ApiError, ApiResult};
use crate::record::CallRecord;
use crate::services::OverrideWriteRequest;
use crate::types::{CallAnalysis, OverrideStatus};
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Request body for `POST /analyze`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// The raw call record as fetched by the collaborator
    pub record: CallRecord,
    /// Ephemeral overrides from the reviewing session (item key →
    /// PASS/FAIL)
    #[serde(default)]
    pub session_overrides: HashMap<String, OverrideStatus>,
    /// Reviewer's auto-fail override flag
    #[serde(default)]
    pub auto_fail_override: bool,
    /// Previously stored score, if known; drift beyond the tolerance
    /// schedules a debounced sync write
    #[serde(default)]
    pub stored_score: Option<u32>,
}

/// `POST /analyze` — derive the full analysis bundle for one call.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<CallAnalysis> {
    let analysis = analyze_call(
        &request.record,
        &request.session_overrides,
        request.auto_fail_override,
        &state.params,
    );

    // Reconcile against the stored baseline when the caller knows one
    if let (Some(scheduler), Some(call_id), Some(stored)) = (
        state.sync.as_ref(),
        request.record.call_id,
        request.stored_score,
    ) {
        scheduler.reconcile(
            call_id,
            analysis.scorecard.display_score,
            stored,
            "recomputed analysis differs from stored score",
        );
    }

    Json(analysis)
}

/// `POST /overrides` — forward a reviewer override to the collaborator.
pub async fn submit_override(
    State(state): State<AppState>,
    Json(request): Json<OverrideWriteRequest>,
) -> ApiResult<Json<Value>> {
    let Some(client) = state.override_api.as_ref() else {
        return Err(ApiError::BadRequest(
            "no override collaborator configured".to_string(),
        ));
    };

    client
        .submit_override(&request)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({ "success": true })))
}

/// `GET /health` — liveness probe with version and uptime.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = (chrono::Utc::now() - state.startup_time).num_seconds();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime,
    }))
}
