//! Full analysis pipeline
//!
//! Composes the six pure components over one raw call record:
//!
//! ```text
//! CallRecord
//!     ↓ normalize_checklist (+ confidence fill)
//!     ↓ autofail::evaluate          (independent)
//!     ↓ overrides (qaNotes blob + session layer)
//!     ↓ scoring::score
//!     ↓ timeline::synthesize
//!     ↓ diarization::diarize
//! CallAnalysis
//! ```
//!
//! `analyze_call` is a pure function: identical inputs always produce the
//! identical bundle, and there is no cached state to invalidate when the
//! duration arrives twice (metadata string first, media-derived value
//! later) — callers simply recompute.

use crate::autofail;
use crate::diarization;
use crate::normalizer;
use crate::overrides::{self, OverrideMap};
use crate::record::CallRecord;
use crate::scoring;
use crate::timeline;
use crate::types::{CallAnalysis, OverrideStatus};
use callqa_common::config::EngineParams;
use std::collections::HashMap;

/// Derive the full analysis bundle for one call.
///
/// Never fails: malformed sections of the record degrade to safe
/// defaults (empty checklist, empty override set, zero duration) and the
/// remaining outputs are still produced.
pub fn analyze_call(
    record: &CallRecord,
    session_overrides: &HashMap<String, OverrideStatus>,
    auto_fail_override: bool,
    params: &EngineParams,
) -> CallAnalysis {
    let items = normalizer::normalize_checklist(record.effective_checklist());

    let auto_fail = autofail::evaluate(record.auto_fail_triggered, &record.auto_fail_reasons);

    let persisted = overrides::parse_qa_notes(record.qa_notes.as_deref());
    let override_map = OverrideMap::from_layers(session_overrides, &persisted);

    let scorecard = scoring::score(&items, &override_map, &auto_fail, auto_fail_override);

    let duration = record.resolved_duration();
    let timeline = timeline::synthesize(
        duration,
        &record.chapters,
        &record.timeline_markers,
        &auto_fail,
        &items,
        &override_map,
        params,
    );

    let turns = diarization::diarize(
        &record.transcript,
        record.agent_name.as_deref(),
        &timeline.markers,
        params,
    );

    tracing::debug!(
        items = items.len(),
        markers = timeline.markers.len(),
        turns = turns.len(),
        display_score = scorecard.display_score,
        "call analysis complete"
    );

    CallAnalysis {
        checklist: items,
        auto_fail,
        scorecard,
        markers: timeline.markers,
        clusters: timeline.clusters,
        turns,
        duration_seconds: duration,
    }
}
