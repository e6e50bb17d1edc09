//! Core types for the CallQA analysis engine
//!
//! Defines the canonical shapes every component exchanges once raw audit
//! payloads cross the normalization boundary:
//!
//! - **ChecklistItem** — one compliance requirement, normalized
//! - **AutoFailReason** — one classified hard-fail/warning event
//! - **TimelineMarker / MarkerCluster** — positioned call events
//! - **TranscriptTurn** — one diarized transcript line
//! - **Scorecard / ScoreStep** — the auditable weighted score breakdown
//!
//! Downstream code never duck-types raw JSON; everything heterogeneous is
//! resolved into these types by the normalizer and evaluator modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Checklist
// ============================================================================

/// Canonical status of a checklist requirement
///
/// Upstream spellings collapse into three classes:
/// - `met` / `pass` / `yes` / `true` → [`ItemStatus::Pass`]
/// - `n/a` / `na` / `not_applicable` → [`ItemStatus::NotApplicable`]
/// - everything else (including `not_met`, `fail`, `no`, `false`) →
///   [`ItemStatus::Fail`]
///
/// A `NotApplicable` item contributes neither weight nor timeline markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pass,
    Fail,
    NotApplicable,
}

impl ItemStatus {
    /// Classify a raw status string.
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "met" | "pass" | "yes" | "true" => ItemStatus::Pass,
            "n/a" | "na" | "not_applicable" | "not applicable" => ItemStatus::NotApplicable,
            _ => ItemStatus::Fail,
        }
    }

    /// Classify a raw boolean status.
    pub fn from_bool(raw: bool) -> Self {
        if raw {
            ItemStatus::Pass
        } else {
            ItemStatus::Fail
        }
    }

    /// Whether this status counts as met for scoring.
    pub fn is_met(self) -> bool {
        matches!(self, ItemStatus::Pass)
    }
}

/// Weight class of a checklist requirement, derived from the weight table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightCategory {
    Critical,
    High,
    Standard,
}

/// One sub-check under a checklist item (label plus raw status string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCheck {
    pub label: String,
    pub status: String,
}

/// One compliance requirement, normalized from whatever shape upstream
/// produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Requirement name (also the override key, lowercased)
    pub name: String,
    /// Canonical status
    pub status: ItemStatus,
    /// Supporting evidence excerpt, if any
    pub evidence: Option<String>,
    /// Reviewer/analyzer notes, if any
    pub notes: Option<String>,
    /// Sub-checks in input order
    pub sub_checks: Vec<SubCheck>,
    /// Derived weight class
    pub weight_category: WeightCategory,
    /// Resolved timestamp in seconds, if any (always ≥ 0)
    pub time_seconds: Option<f64>,
    /// Display form of the timestamp (`M:SS`), if any
    pub time_display: Option<String>,
    /// Confidence estimate, 0-100
    pub confidence: u8,
}

impl ChecklistItem {
    /// Override key for this item: the lowercased name.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

// ============================================================================
// Auto-fail
// ============================================================================

/// Severity class of an auto-fail reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

/// One auto-fail reason, classified
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoFailReason {
    /// Machine code for the violation family
    pub code: String,
    /// Human description of the violation
    pub violation: String,
    /// Supporting evidence excerpt, if any
    pub evidence: Option<String>,
    /// Raw timestamp as provided (string form), if any
    pub timestamp: Option<String>,
    /// Timestamp resolved to seconds, if any
    pub seconds: Option<f64>,
    /// Classified severity (warning-only codes are always `Warning`)
    pub severity: Severity,
}

/// Result of auto-fail evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoFailEvaluation {
    /// Whether auto-fail is active (flag set AND at least one critical
    /// reason)
    pub triggered: bool,
    /// Critical violations
    pub critical: Vec<AutoFailReason>,
    /// Warning-only notes
    pub warnings: Vec<AutoFailReason>,
}

// ============================================================================
// Overrides
// ============================================================================

/// Reviewer-corrected status, the only two values an override can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverrideStatus {
    Pass,
    Fail,
}

impl OverrideStatus {
    /// The canonical item status this override imposes.
    pub fn as_item_status(self) -> ItemStatus {
        match self {
            OverrideStatus::Pass => ItemStatus::Pass,
            OverrideStatus::Fail => ItemStatus::Fail,
        }
    }
}

/// Where an override came from; session overrides outrank persisted ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideSource {
    Session,
    Persisted,
}

// ============================================================================
// Timeline
// ============================================================================

/// Rendering class of a timeline marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Pass,
    Fail,
    Transfer,
    Chapter,
    /// Warning-only auto-fail events render distinctly from hard fails
    Note,
}

/// A positioned event on the call's normalized 0-100 timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineMarker {
    pub title: String,
    /// Event time in seconds (always ≥ 0)
    pub seconds: f64,
    /// Normalized position, clamped to [0, 100]
    pub position: f64,
    pub kind: MarkerKind,
    /// True when the time was estimated positionally rather than taken
    /// from an explicit timestamp
    pub estimated: bool,
}

/// Markers close enough in position to render as one aggregate badge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerCluster {
    /// Position of the cluster's first member
    pub anchor_position: f64,
    /// Seconds of the cluster's first member
    pub anchor_seconds: f64,
    /// Members in position order
    pub members: Vec<TimelineMarker>,
}

// ============================================================================
// Transcript
// ============================================================================

/// Resolved speaker role for a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    Agent,
    Prospect,
}

/// One diarized transcript line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    /// Raw label as parsed (or inherited) from the transcript
    pub speaker_label: String,
    /// Resolved role
    pub role: SpeakerRole,
    /// Spoken content with timestamp/label tokens stripped
    pub content: String,
    pub start_seconds: f64,
    /// Next turn's start, or own start plus the last-turn padding
    pub end_seconds: f64,
    /// Timeline markers whose seconds fall in `[start, end)`
    pub associated_markers: Vec<TimelineMarker>,
}

// ============================================================================
// Scoring
// ============================================================================

/// One row of the auditable score breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreStep {
    pub name: String,
    pub weight: u32,
    pub category: WeightCategory,
    /// Effective status after override resolution
    pub status: ItemStatus,
    pub met: bool,
    /// Set when an override determined the effective status
    pub override_source: Option<OverrideSource>,
    pub confidence: u8,
}

/// The weighted compliance score with its breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scorecard {
    pub steps: Vec<ScoreStep>,
    pub earned: u32,
    pub possible: u32,
    /// round(100 · earned / possible); 0 when possible is 0
    pub score_percent: u32,
    /// Score as shown to reviewers: 0 under an unoverridden auto-fail,
    /// otherwise `score_percent`
    pub display_score: u32,
    /// True when an active auto-fail forced the display score to 0
    pub auto_fail_applied: bool,
    /// True when a reviewer override unlocked the score despite a
    /// triggered auto-fail (displayed with an "(Override)" annotation)
    pub auto_fail_overridden: bool,
}

// ============================================================================
// Analysis bundle
// ============================================================================

/// The full derived analysis for one call
///
/// Recomputed wholesale whenever any upstream input changes; no field is
/// ever incrementally patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnalysis {
    pub checklist: Vec<ChecklistItem>,
    pub auto_fail: AutoFailEvaluation,
    pub scorecard: Scorecard,
    pub markers: Vec<TimelineMarker>,
    pub clusters: Vec<MarkerCluster>,
    pub turns: Vec<TranscriptTurn>,
    /// Duration used for position math, in seconds
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ItemStatus::classify("met"), ItemStatus::Pass);
        assert_eq!(ItemStatus::classify("PASS"), ItemStatus::Pass);
        assert_eq!(ItemStatus::classify("Yes"), ItemStatus::Pass);
        assert_eq!(ItemStatus::classify("true"), ItemStatus::Pass);
        assert_eq!(ItemStatus::classify("not_met"), ItemStatus::Fail);
        assert_eq!(ItemStatus::classify("fail"), ItemStatus::Fail);
        assert_eq!(ItemStatus::classify("no"), ItemStatus::Fail);
        assert_eq!(ItemStatus::classify("false"), ItemStatus::Fail);
        assert_eq!(ItemStatus::classify("n/a"), ItemStatus::NotApplicable);
        assert_eq!(ItemStatus::classify("NA"), ItemStatus::NotApplicable);
        assert_eq!(ItemStatus::classify("not_applicable"), ItemStatus::NotApplicable);
    }

    #[test]
    fn test_unknown_status_is_fail() {
        assert_eq!(ItemStatus::classify("partial"), ItemStatus::Fail);
        assert_eq!(ItemStatus::classify(""), ItemStatus::Fail);
    }

    #[test]
    fn test_override_status_serde_contract() {
        // The collaborator contract spells these PASS | FAIL
        assert_eq!(serde_json::to_string(&OverrideStatus::Pass).unwrap(), "\"PASS\"");
        assert_eq!(serde_json::to_string(&OverrideStatus::Fail).unwrap(), "\"FAIL\"");
        let parsed: OverrideStatus = serde_json::from_str("\"PASS\"").unwrap();
        assert_eq!(parsed, OverrideStatus::Pass);
    }

    #[test]
    fn test_item_key_is_lowercased_name() {
        let item = ChecklistItem {
            name: "Recording Disclosure".to_string(),
            status: ItemStatus::Pass,
            evidence: None,
            notes: None,
            sub_checks: vec![],
            weight_category: WeightCategory::Critical,
            time_seconds: None,
            time_display: None,
            confidence: 70,
        };
        assert_eq!(item.key(), "recording disclosure");
    }
}
