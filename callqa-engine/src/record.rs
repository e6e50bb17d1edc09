//! Raw call-record input model
//!
//! The shape a collaborator hands us when a call is opened for review.
//! The heterogeneous fields (checklist, auto-fail reasons, chapters,
//! explicit markers) stay as `serde_json::Value` here and cross exactly
//! one normalization boundary each — nothing downstream of the
//! normalizer/evaluator modules ever touches raw JSON.
//!
//! Deserialization is lenient throughout: every field defaults, so a
//! record missing half its data still produces an analysis (degraded,
//! never an error).

use callqa_common::time::parse_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A field that upstream serializes as either a number or a string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumOrStr {
    Num(f64),
    Str(String),
}

impl NumOrStr {
    /// Resolve to seconds: numbers pass through, strings go through the
    /// tolerant timestamp parser.
    pub fn as_seconds(&self) -> f64 {
        match self {
            NumOrStr::Num(n) => *n,
            NumOrStr::Str(s) => parse_timestamp(s),
        }
    }
}

/// Secondary nested analysis payload; consulted when the primary
/// checklist is empty or malformed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NestedAnalysis {
    pub checklist: Value,
}

/// One call record as fetched by a collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallRecord {
    /// Call identifier, used for collaborator writes
    pub call_id: Option<Uuid>,
    /// Raw transcript text
    pub transcript: String,
    /// Heterogeneous checklist payload (array, mapping, or garbage)
    pub checklist: Value,
    /// Secondary nested source for the checklist
    pub analysis: Option<NestedAnalysis>,
    /// Upstream auto-fail flag
    pub auto_fail_triggered: bool,
    /// Raw auto-fail reasons (strings or structured objects)
    pub auto_fail_reasons: Value,
    /// Chapter records
    pub chapters: Value,
    /// Explicit timeline marker records
    pub timeline_markers: Value,
    /// Display duration string (fallback, e.g. `"12:34"`)
    pub duration: Option<String>,
    /// Authoritative media-derived duration in seconds
    pub media_duration_seconds: Option<f64>,
    /// Known agent name for diarization
    pub agent_name: Option<String>,
    /// Free-text QA notes; may embed a JSON overrides blob
    pub qa_notes: Option<String>,
}

/// Stand-in for an absent checklist; normalizing null yields no items
static NO_CHECKLIST: Value = Value::Null;

impl CallRecord {
    /// The checklist payload to normalize: the primary field when it is
    /// usable, otherwise the secondary nested source, otherwise null.
    pub fn effective_checklist(&self) -> &Value {
        if checklist_usable(&self.checklist) {
            return &self.checklist;
        }
        if let Some(analysis) = &self.analysis {
            if checklist_usable(&analysis.checklist) {
                tracing::debug!("primary checklist empty or malformed, using nested source");
                return &analysis.checklist;
            }
        }
        &NO_CHECKLIST
    }

    /// Duration used for position math. The authoritative media-derived
    /// value wins over the display string; both absent resolves to 0.
    pub fn resolved_duration(&self) -> f64 {
        if let Some(d) = self.media_duration_seconds {
            if d.is_finite() && d > 0.0 {
                return d;
            }
        }
        match &self.duration {
            Some(display) => parse_timestamp(display),
            None => 0.0,
        }
    }
}

/// A checklist payload is usable when it is a non-empty array or a
/// non-empty object.
fn checklist_usable(value: &Value) -> bool {
    match value {
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => false,
    }
}
