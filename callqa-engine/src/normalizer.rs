//! Checklist normalization
//!
//! Upstream produces checklists in three shapes — an array (of strings
//! or objects), a string-keyed mapping, or garbage — and spells the same
//! field half a dozen ways. This module is the single boundary where all
//! of that collapses into an ordered `Vec<ChecklistItem>`.
//!
//! # Field resolution
//! Every alias fallback is encoded as one ordered priority list evaluated
//! once per item, never as scattered inline checks:
//! - name: `name` → `requirement` → `requirement_name` → mapping key →
//!   positional `Item N`
//! - time: numeric seconds field → strict `M:SS` string field → none
//! - confidence: provided value (fractions ×100, ≤10 rejected) →
//!   calculated estimate
//!
//! # Ordering
//! Output is sorted ascending by resolved seconds; items with no
//! resolvable timestamp sort last, preserving their relative input order.

use crate::confidence;
use crate::scoring;
use crate::types::{ChecklistItem, ItemStatus, SubCheck};
use callqa_common::time::{format_clock, parse_clock_strict};
use serde_json::{Map, Value};

/// Numeric seconds fields, highest priority first
const TIME_SECONDS_FIELDS: [&str; 3] = ["time_seconds", "timeSeconds", "seconds"];

/// Clock-string fields, highest priority first
const TIME_STRING_FIELDS: [&str; 6] = [
    "time",
    "timestamp",
    "start_time",
    "startTime",
    "time_display",
    "displayTime",
];

/// Name fields, highest priority first
const NAME_FIELDS: [&str; 3] = ["name", "requirement", "requirement_name"];

/// Sub-check container fields
const SUB_CHECK_FIELDS: [&str; 2] = ["sub_checks", "subChecks"];

/// Normalize a raw checklist payload of unknown shape into an ordered
/// canonical item list.
///
/// Never fails: unusable payloads yield an empty list, unusable elements
/// are skipped.
pub fn normalize_checklist(raw: &Value) -> Vec<ChecklistItem> {
    let mut items = match raw {
        Value::Array(elements) => normalize_array(elements),
        Value::Object(map) => normalize_mapping(map),
        _ => {
            if !raw.is_null() {
                tracing::debug!(kind = raw_kind(raw), "unusable checklist payload shape");
            }
            Vec::new()
        }
    };

    // Ascending by resolved seconds; unresolved items sort last and keep
    // their relative input order (stable sort)
    items.sort_by(|a, b| {
        let ka = a.time_seconds.unwrap_or(f64::INFINITY);
        let kb = b.time_seconds.unwrap_or(f64::INFINITY);
        ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
    });

    items
}

fn normalize_array(elements: &[Value]) -> Vec<ChecklistItem> {
    let mut items = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        match element {
            // Bare string elements are requirements observed as met
            Value::String(name) if !name.trim().is_empty() => {
                items.push(finalize(make_item(name.trim(), ItemStatus::Pass), None));
            }
            Value::Object(obj) => items.push(item_from_object(obj, index, None)),
            _ => {
                tracing::debug!(index, "skipping unusable checklist element");
            }
        }
    }
    items
}

fn normalize_mapping(map: &Map<String, Value>) -> Vec<ChecklistItem> {
    let mut items = Vec::with_capacity(map.len());
    for (index, (key, value)) in map.iter().enumerate() {
        let label = humanize_key(key);
        match value {
            // Scalar string values are the requirement's status
            Value::String(status) => {
                items.push(finalize(
                    make_item(&label, ItemStatus::classify(status)),
                    None,
                ));
            }
            Value::Bool(flag) => {
                items.push(finalize(make_item(&label, ItemStatus::from_bool(*flag)), None));
            }
            Value::Object(obj) => items.push(item_from_object(obj, index, Some(&label))),
            _ => {
                tracing::debug!(key = %key, "skipping unusable checklist entry");
            }
        }
    }
    items
}

/// Build an item from an object element, resolving every aliased field.
fn item_from_object(obj: &Map<String, Value>, index: usize, label: Option<&str>) -> ChecklistItem {
    let name = NAME_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| label.map(String::from))
        .unwrap_or_else(|| format!("Item {}", index + 1));

    let status = match obj.get("status") {
        Some(Value::String(s)) => ItemStatus::classify(s),
        Some(Value::Bool(b)) => ItemStatus::from_bool(*b),
        _ => ItemStatus::classify(""),
    };

    let (time_seconds, time_display) = resolve_time(obj);

    let mut item = make_item(&name, status);
    item.evidence = text_field(obj, "evidence");
    item.notes = text_field(obj, "notes");
    item.sub_checks = sub_checks(obj);
    item.time_seconds = time_seconds;
    item.time_display = time_display;

    finalize(item, provided_confidence(obj))
}

fn make_item(name: &str, status: ItemStatus) -> ChecklistItem {
    let (_, category) = scoring::weight_for(name);
    ChecklistItem {
        name: name.to_string(),
        status,
        evidence: None,
        notes: None,
        sub_checks: Vec::new(),
        weight_category: category,
        time_seconds: None,
        time_display: None,
        confidence: 0,
    }
}

/// Fill the confidence slot: a valid provided value wins, otherwise the
/// calculated estimate.
fn finalize(mut item: ChecklistItem, provided: Option<u8>) -> ChecklistItem {
    item.confidence = provided.unwrap_or_else(|| confidence::estimate(&item));
    item
}

/// Resolve an item's timestamp by priority: numeric seconds field, then
/// strict `M:SS` string field, then unresolved.
fn resolve_time(obj: &Map<String, Value>) -> (Option<f64>, Option<String>) {
    // Priority 1: explicit numeric seconds
    for field in TIME_SECONDS_FIELDS {
        if let Some(v) = obj.get(field).and_then(Value::as_f64) {
            if v.is_finite() && v >= 0.0 {
                let display = clock_string_field(obj).unwrap_or_else(|| format_clock(v));
                return (Some(v), Some(display));
            }
        }
    }

    // Priority 2: a strict M:SS string field
    for field in TIME_STRING_FIELDS {
        if let Some(s) = obj.get(field).and_then(Value::as_str) {
            if let Some(seconds) = parse_clock_strict(s) {
                return (Some(seconds), Some(s.trim().to_string()));
            }
        }
    }

    (None, None)
}

/// First string field already in `M:SS` form, for display reuse.
fn clock_string_field(obj: &Map<String, Value>) -> Option<String> {
    for field in TIME_STRING_FIELDS {
        if let Some(s) = obj.get(field).and_then(Value::as_str) {
            if parse_clock_strict(s).is_some() {
                return Some(s.trim().to_string());
            }
        }
    }
    None
}

/// Normalize a provided confidence value.
///
/// Fractions (≤1) scale to percentages; values normalizing to ≤10 are
/// untrustworthy and rejected so the calculated estimate applies instead.
fn provided_confidence(obj: &Map<String, Value>) -> Option<u8> {
    let v = obj.get("confidence").and_then(Value::as_f64)?;
    if !v.is_finite() {
        return None;
    }
    let scaled = if v <= 1.0 { v * 100.0 } else { v };
    let rounded = scaled.round();
    if rounded <= 10.0 {
        return None;
    }
    Some(rounded.min(100.0) as u8)
}

fn text_field(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn sub_checks(obj: &Map<String, Value>) -> Vec<SubCheck> {
    for field in SUB_CHECK_FIELDS {
        if let Some(Value::Object(map)) = obj.get(field) {
            return map
                .iter()
                .map(|(label, status)| SubCheck {
                    label: label.clone(),
                    status: match status {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                })
                .collect();
        }
    }
    Vec::new()
}

/// Convert a snake_case or camelCase key into a Title Case label.
pub(crate) fn humanize_key(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for chunk in key.split(['_', '-', ' ']) {
        if chunk.is_empty() {
            continue;
        }
        // Split camelCase boundaries within the chunk
        let mut word = String::new();
        for (i, c) in chunk.chars().enumerate() {
            if c.is_uppercase() && i > 0 {
                if !word.is_empty() {
                    words.push(word.clone());
                    word.clear();
                }
            }
            word.push(c);
        }
        if !word.is_empty() {
            words.push(word);
        }
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn raw_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
