//! Timeline synthesis
//!
//! Merges chapters, explicit marker records, auto-fail events, and scored
//! checklist items into one position-normalized, decluttered marker list
//! for a fixed-duration recording, plus an independent clustering pass
//! for aggregate-badge rendering.
//!
//! # Seconds resolution, per candidate event
//! 1. Explicit numeric seconds field (≥ 0; the −1 sentinel is absent)
//! 2. Parseable display string (tolerant, see `callqa_common::time`)
//! 3. `[M:SS]` timestamp embedded in evidence text
//! 4. Positional estimate — checklist items only:
//!    `10% + (index / (n−1)) · 80%` of the duration
//!
//! # Filtering
//! Events with unresolvable seconds, positions past 100, or non-finite
//! math are discarded. Events below the minimum-time floor are dropped
//! unless their timestamp was explicit, which relaxes the floor to > 0.
//!
//! # Decluttering
//! A single left-to-right anti-overlap sweep over seconds-sorted markers
//! shifts any marker closer than the threshold to its predecessor out to
//! `previous + threshold`, then clamps to 100. Clustering is a separate,
//! position-only pass and never moves markers.

use crate::overrides::OverrideMap;
use crate::scoring::effective_status;
use crate::types::{
    AutoFailEvaluation, AutoFailReason, ChecklistItem, ItemStatus, MarkerCluster, MarkerKind,
    TimelineMarker,
};
use callqa_common::config::EngineParams;
use callqa_common::time::{embedded_timestamp, parse_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric seconds fields on chapter/marker records, highest priority
/// first
const SECONDS_FIELDS: [&str; 4] = ["time_seconds", "timeSeconds", "seconds", "start_seconds"];

/// Display-string fields on chapter/marker records, highest priority
/// first
const DISPLAY_FIELDS: [&str; 5] = ["time", "timestamp", "start_time", "startTime", "displayTime"];

/// Title fields on chapter/marker records, highest priority first
const TITLE_FIELDS: [&str; 3] = ["title", "label", "name"];

/// The synthesized timeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub markers: Vec<TimelineMarker>,
    pub clusters: Vec<MarkerCluster>,
}

/// One candidate event before filtering
struct Candidate {
    title: String,
    seconds: Option<f64>,
    estimated: bool,
    kind: MarkerKind,
}

/// Synthesize the timeline for one call.
pub fn synthesize(
    duration: f64,
    chapters: &Value,
    marker_records: &Value,
    auto_fail: &AutoFailEvaluation,
    items: &[ChecklistItem],
    overrides: &OverrideMap,
    params: &EngineParams,
) -> Timeline {
    let mut candidates = Vec::new();
    collect_chapters(chapters, &mut candidates);
    collect_marker_records(marker_records, &mut candidates);
    collect_auto_fail(auto_fail, &mut candidates);
    collect_checklist(items, overrides, duration, &mut candidates);

    let mut markers = resolve_candidates(candidates, duration, params);
    anti_overlap_pass(&mut markers, params.anti_overlap_threshold);
    let clusters = cluster_markers(&markers, params.cluster_threshold);

    tracing::debug!(
        markers = markers.len(),
        clusters = clusters.len(),
        duration,
        "timeline synthesis complete"
    );

    Timeline { markers, clusters }
}

fn collect_chapters(chapters: &Value, out: &mut Vec<Candidate>) {
    let Value::Array(elements) = chapters else {
        return;
    };
    for (index, element) in elements.iter().enumerate() {
        let Value::Object(obj) = element else {
            continue;
        };
        let title = title_field(obj).unwrap_or_else(|| format!("Chapter {}", index + 1));
        let seconds = record_seconds(obj);
        out.push(Candidate {
            title,
            seconds,
            estimated: false,
            kind: MarkerKind::Chapter,
        });
    }
}

fn collect_marker_records(marker_records: &Value, out: &mut Vec<Candidate>) {
    let Value::Array(elements) = marker_records else {
        return;
    };
    for (index, element) in elements.iter().enumerate() {
        let Value::Object(obj) = element else {
            continue;
        };
        let title = title_field(obj).unwrap_or_else(|| format!("Marker {}", index + 1));
        let kind = marker_kind(obj);
        let seconds = record_seconds(obj);
        out.push(Candidate {
            title,
            seconds,
            estimated: false,
            kind,
        });
    }
}

fn collect_auto_fail(auto_fail: &AutoFailEvaluation, out: &mut Vec<Candidate>) {
    for reason in &auto_fail.critical {
        out.push(auto_fail_candidate(reason, MarkerKind::Fail));
    }
    // Warning-only events render as notes, never as hard fails
    for reason in &auto_fail.warnings {
        out.push(auto_fail_candidate(reason, MarkerKind::Note));
    }
}

fn auto_fail_candidate(reason: &AutoFailReason, kind: MarkerKind) -> Candidate {
    let seconds = reason
        .seconds
        .filter(|s| s.is_finite() && *s >= 0.0)
        .or_else(|| reason.evidence.as_deref().and_then(embedded_timestamp));
    Candidate {
        title: reason.violation.clone(),
        seconds,
        estimated: false,
        kind,
    }
}

fn collect_checklist(
    items: &[ChecklistItem],
    overrides: &OverrideMap,
    duration: f64,
    out: &mut Vec<Candidate>,
) {
    let n = items.len();
    for (index, item) in items.iter().enumerate() {
        if item.status == ItemStatus::NotApplicable {
            continue;
        }

        let (status, _) = effective_status(item, overrides);
        let kind = if status.is_met() {
            MarkerKind::Pass
        } else {
            MarkerKind::Fail
        };

        let explicit = item
            .time_seconds
            .filter(|s| s.is_finite() && *s >= 0.0)
            .or_else(|| item.evidence.as_deref().and_then(embedded_timestamp));

        let (seconds, estimated) = match explicit {
            Some(s) => (Some(s), false),
            None => (Some(positional_estimate(index, n, duration)), true),
        };

        out.push(Candidate {
            title: item.name.clone(),
            seconds,
            estimated,
            kind,
        });
    }
}

/// Spread untimed checklist items across the middle 80% of the call.
fn positional_estimate(index: usize, n: usize, duration: f64) -> f64 {
    let spread = if n > 1 {
        index as f64 / (n - 1) as f64
    } else {
        0.0
    };
    duration * (0.10 + spread * 0.80)
}

/// Apply position math, range checks, and the minimum-time floor.
fn resolve_candidates(
    candidates: Vec<Candidate>,
    duration: f64,
    params: &EngineParams,
) -> Vec<TimelineMarker> {
    let mut markers = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(seconds) = candidate.seconds else {
            continue;
        };
        if !seconds.is_finite() || seconds < 0.0 {
            continue;
        }

        let position = if duration > 0.0 {
            seconds / duration * 100.0
        } else {
            0.0
        };
        if !position.is_finite() || position > 100.0 {
            continue;
        }

        // Estimated markers respect the full floor; explicit timestamps
        // relax it to > 0
        if candidate.estimated {
            if seconds < params.min_marker_seconds {
                continue;
            }
        } else if seconds <= 0.0 {
            continue;
        }

        markers.push(TimelineMarker {
            title: candidate.title,
            seconds,
            position,
            kind: candidate.kind,
            estimated: candidate.estimated,
        });
    }
    markers
}

/// Anti-overlap sweep: seconds-sorted walk that pushes each marker at
/// least `threshold` position units past its predecessor, then clamps.
pub(crate) fn anti_overlap_pass(markers: &mut Vec<TimelineMarker>, threshold: f64) {
    markers.sort_by(|a, b| {
        a.seconds
            .partial_cmp(&b.seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for i in 1..markers.len() {
        let previous = markers[i - 1].position;
        if markers[i].position - previous < threshold {
            markers[i].position = previous + threshold;
        }
    }

    for marker in markers.iter_mut() {
        marker.position = marker.position.min(100.0);
    }
}

/// Group position-sorted markers into clusters: a marker joins the active
/// cluster while it sits within `threshold` of the cluster's anchor (its
/// first member), otherwise it starts a new cluster.
///
/// Only position order matters; the result is independent of input order.
pub fn cluster_markers(markers: &[TimelineMarker], threshold: f64) -> Vec<MarkerCluster> {
    let mut sorted: Vec<TimelineMarker> = markers.to_vec();
    sorted.sort_by(|a, b| {
        a.position
            .partial_cmp(&b.position)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut clusters: Vec<MarkerCluster> = Vec::new();
    for marker in sorted {
        if let Some(cluster) = clusters.last_mut() {
            if marker.position - cluster.anchor_position <= threshold {
                cluster.members.push(marker);
                continue;
            }
        }
        clusters.push(MarkerCluster {
            anchor_position: marker.position,
            anchor_seconds: marker.seconds,
            members: vec![marker],
        });
    }
    clusters
}

fn title_field(obj: &Map<String, Value>) -> Option<String> {
    TITLE_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Explicit marker records are transfers when their type/status says so,
/// otherwise pass/fail by status.
fn marker_kind(obj: &Map<String, Value>) -> MarkerKind {
    let label = ["type", "status", "kind"]
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_str))
        .unwrap_or("")
        .to_lowercase();
    if label.contains("transfer") || label.contains("info") {
        return MarkerKind::Transfer;
    }
    if ItemStatus::classify(&label).is_met() {
        MarkerKind::Pass
    } else {
        MarkerKind::Fail
    }
}

/// Resolve a record's seconds: numeric field first (−1 is the "unset"
/// sentinel), then a tolerant parse of the first display string.
fn record_seconds(obj: &Map<String, Value>) -> Option<f64> {
    for field in SECONDS_FIELDS {
        if let Some(v) = obj.get(field).and_then(Value::as_f64) {
            if v.is_finite() && v >= 0.0 {
                return Some(v);
            }
        }
    }
    for field in DISPLAY_FIELDS {
        if let Some(s) = obj.get(field).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return Some(parse_timestamp(s));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> EngineParams {
        EngineParams::default()
    }

    fn marker(seconds: f64, position: f64) -> TimelineMarker {
        TimelineMarker {
            title: format!("m@{seconds}"),
            seconds,
            position,
            kind: MarkerKind::Pass,
            estimated: false,
        }
    }

    fn item(name: &str, status: ItemStatus, time_seconds: Option<f64>) -> ChecklistItem {
        ChecklistItem {
            name: name.to_string(),
            status,
            evidence: None,
            notes: None,
            sub_checks: vec![],
            weight_category: crate::types::WeightCategory::Standard,
            time_seconds,
            time_display: None,
            confidence: 70,
        }
    }

    #[test]
    fn test_anti_overlap_shifts_second_marker() {
        let mut markers = vec![marker(10.0, 10.0), marker(10.5, 10.5)];
        anti_overlap_pass(&mut markers, 1.2);
        assert_eq!(markers[0].position, 10.0);
        assert!((markers[1].position - 11.2).abs() < 1e-9);
    }

    #[test]
    fn test_anti_overlap_cascades_monotonically() {
        let mut markers = vec![marker(10.0, 10.0), marker(10.2, 10.2), marker(10.4, 10.4)];
        anti_overlap_pass(&mut markers, 1.2);
        assert!((markers[1].position - 11.2).abs() < 1e-9);
        assert!((markers[2].position - 12.4).abs() < 1e-9);
    }

    #[test]
    fn test_anti_overlap_clamps_to_hundred() {
        let mut markers = vec![marker(99.0, 99.5), marker(99.5, 99.6)];
        anti_overlap_pass(&mut markers, 1.2);
        assert_eq!(markers[1].position, 100.0);
    }

    #[test]
    fn test_explicit_timestamp_relaxes_floor() {
        let items = vec![
            item("Greeting", ItemStatus::Pass, Some(2.0)),
            item("Consent", ItemStatus::Pass, Some(0.0)),
        ];
        let timeline = synthesize(
            100.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        // Explicit 2s survives the 5s floor; explicit 0s does not
        assert_eq!(timeline.markers.len(), 1);
        assert_eq!(timeline.markers[0].title, "Greeting");
    }

    #[test]
    fn test_estimated_markers_respect_floor() {
        // One untimed item in a 30s call estimates to 3s, under the floor
        let items = vec![item("Greeting", ItemStatus::Pass, None)];
        let timeline = synthesize(
            30.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        assert!(timeline.markers.is_empty());
    }

    #[test]
    fn test_positional_estimates_spread_across_call() {
        let items = vec![
            item("First", ItemStatus::Pass, None),
            item("Second", ItemStatus::Pass, None),
            item("Third", ItemStatus::Fail, None),
        ];
        let timeline = synthesize(
            100.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        let positions: Vec<f64> = timeline.markers.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![10.0, 50.0, 90.0]);
        assert!(timeline.markers.iter().all(|m| m.estimated));
        assert_eq!(timeline.markers[2].kind, MarkerKind::Fail);
    }

    #[test]
    fn test_past_end_markers_discarded() {
        let items = vec![item("Late", ItemStatus::Pass, Some(120.0))];
        let timeline = synthesize(
            100.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        assert!(timeline.markers.is_empty());
    }

    #[test]
    fn test_zero_duration_positions_default_to_zero() {
        let items = vec![item("Consent", ItemStatus::Pass, Some(30.0))];
        let timeline = synthesize(
            0.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        assert_eq!(timeline.markers.len(), 1);
        assert_eq!(timeline.markers[0].position, 0.0);
    }

    #[test]
    fn test_chapter_and_transfer_kinds() {
        let chapters = json!([
            { "title": "Discovery", "time_seconds": 30.0 },
        ]);
        let records = json!([
            { "label": "Warm transfer", "type": "transfer", "time": "1:00" },
            { "label": "Verified", "status": "pass", "time_seconds": 90.0 },
        ]);
        let timeline = synthesize(
            200.0,
            &chapters,
            &records,
            &AutoFailEvaluation::default(),
            &[],
            &OverrideMap::new(),
            &params(),
        );
        let kinds: Vec<MarkerKind> = timeline.markers.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MarkerKind::Chapter, MarkerKind::Transfer, MarkerKind::Pass]
        );
    }

    #[test]
    fn test_auto_fail_kinds_split_critical_and_warning() {
        let auto_fail = AutoFailEvaluation {
            triggered: true,
            critical: vec![AutoFailReason {
                code: "dnc_violation".to_string(),
                violation: "Called a DNC number".to_string(),
                evidence: None,
                timestamp: None,
                seconds: Some(45.0),
                severity: crate::types::Severity::Critical,
            }],
            warnings: vec![AutoFailReason {
                code: "background_noise".to_string(),
                violation: "Line noise".to_string(),
                evidence: Some("noted at [1:30] on the recording".to_string()),
                timestamp: None,
                seconds: None,
                severity: crate::types::Severity::Warning,
            }],
        };
        let timeline = synthesize(
            200.0,
            &Value::Null,
            &Value::Null,
            &auto_fail,
            &[],
            &OverrideMap::new(),
            &params(),
        );
        assert_eq!(timeline.markers.len(), 2);
        assert_eq!(timeline.markers[0].kind, MarkerKind::Fail);
        assert_eq!(timeline.markers[0].seconds, 45.0);
        // Warning resolved its seconds from the evidence text
        assert_eq!(timeline.markers[1].kind, MarkerKind::Note);
        assert_eq!(timeline.markers[1].seconds, 90.0);
    }

    #[test]
    fn test_override_flips_marker_kind() {
        let items = vec![item("Consent", ItemStatus::Fail, Some(30.0))];
        let mut session = std::collections::HashMap::new();
        session.insert("consent".to_string(), crate::types::OverrideStatus::Pass);
        let overrides = OverrideMap::from_layers(&session, &[]);
        let timeline = synthesize(
            100.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &overrides,
            &params(),
        );
        assert_eq!(timeline.markers[0].kind, MarkerKind::Pass);
    }

    #[test]
    fn test_na_items_produce_no_markers() {
        let items = vec![item("Consent", ItemStatus::NotApplicable, Some(30.0))];
        let timeline = synthesize(
            100.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        assert!(timeline.markers.is_empty());
    }

    #[test]
    fn test_clustering_groups_within_threshold_of_anchor() {
        let markers = vec![
            marker(10.0, 10.0),
            marker(11.0, 11.0),
            marker(11.8, 11.8),
            marker(20.0, 20.0),
        ];
        let clusters = cluster_markers(&markers, 2.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members.len(), 3);
        assert_eq!(clusters[0].anchor_position, 10.0);
        assert_eq!(clusters[1].members.len(), 1);
    }

    #[test]
    fn test_clustering_anchor_is_first_member_not_last() {
        // 12.5 is within 2.0 of 11.8 but not of the 10.0 anchor
        let markers = vec![marker(10.0, 10.0), marker(11.8, 11.8), marker(12.5, 12.5)];
        let clusters = cluster_markers(&markers, 2.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].anchor_position, 12.5);
    }

    #[test]
    fn test_clustering_independent_of_input_order() {
        let forward = vec![marker(10.0, 10.0), marker(11.0, 11.0), marker(30.0, 30.0)];
        let mut reversed = forward.clone();
        reversed.reverse();
        let a = cluster_markers(&forward, 2.0);
        let b = cluster_markers(&reversed, 2.0);
        assert_eq!(a.len(), b.len());
        for (ca, cb) in a.iter().zip(b.iter()) {
            assert_eq!(ca.anchor_position, cb.anchor_position);
            assert_eq!(ca.members.len(), cb.members.len());
        }
    }

    #[test]
    fn test_all_positions_within_range_after_passes() {
        let items: Vec<ChecklistItem> = (0..12)
            .map(|i| item(&format!("Item {i}"), ItemStatus::Pass, Some(95.0 + i as f64 * 0.1)))
            .collect();
        let timeline = synthesize(
            100.0,
            &Value::Null,
            &Value::Null,
            &AutoFailEvaluation::default(),
            &items,
            &OverrideMap::new(),
            &params(),
        );
        assert!(timeline
            .markers
            .iter()
            .all(|m| (0.0..=100.0).contains(&m.position)));
    }
}
