//! Auto-fail evaluation
//!
//! Classifies raw auto-fail reasons into critical violations vs.
//! warning-only notes and decides whether auto-fail is actually active.
//! Upstream is inconsistent here: the flag is sometimes set with nothing
//! but warning-grade reasons behind it, and declared severities are not
//! trustworthy for the codes in the warning-only set. Both are resolved
//! by rule, never treated as data errors.

use crate::record::NumOrStr;
use crate::types::{AutoFailEvaluation, AutoFailReason, Severity};
use serde_json::{Map, Value};

/// Codes that are never critical, regardless of any upstream-declared
/// severity. These surface on the timeline as notes, not hard fails.
pub const WARNING_ONLY_CODES: [&str; 5] = [
    "excessive_hold",
    "background_noise",
    "call_quality",
    "long_silence",
    "minor_script_deviation",
];

/// Violation-text fields, highest priority first
const VIOLATION_FIELDS: [&str; 4] = ["violation", "reason", "description", "message"];

/// Timestamp fields, highest priority first
const TIMESTAMP_FIELDS: [&str; 2] = ["timestamp", "time"];

/// Evaluate the raw auto-fail flag against its reasons list.
///
/// `triggered` is true only when the flag is set AND at least one reason
/// survives as critical — a flag backed solely by warning-only reasons
/// never surfaces as a hard fail.
pub fn evaluate(flag: bool, raw_reasons: &Value) -> AutoFailEvaluation {
    let mut critical = Vec::new();
    let mut warnings = Vec::new();

    if let Value::Array(elements) = raw_reasons {
        for element in elements {
            let Some(reason) = parse_reason(element) else {
                tracing::debug!("skipping unusable auto-fail reason element");
                continue;
            };
            match reason.severity {
                Severity::Critical => critical.push(reason),
                Severity::Warning => warnings.push(reason),
            }
        }
    }

    let triggered = flag && !critical.is_empty();
    if flag && !triggered {
        tracing::debug!(
            warnings = warnings.len(),
            "auto-fail flag set but no critical reasons, suppressing"
        );
    }

    AutoFailEvaluation {
        triggered,
        critical,
        warnings,
    }
}

fn parse_reason(element: &Value) -> Option<AutoFailReason> {
    match element {
        Value::String(text) if !text.trim().is_empty() => {
            let text = text.trim();
            let code = slug_code(text);
            let severity = classify(&code, None);
            Some(AutoFailReason {
                code,
                violation: text.to_string(),
                evidence: None,
                timestamp: None,
                seconds: None,
                severity,
            })
        }
        Value::Object(obj) => Some(reason_from_object(obj)),
        _ => None,
    }
}

fn reason_from_object(obj: &Map<String, Value>) -> AutoFailReason {
    let violation = VIOLATION_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let code = obj
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| slug_code(violation.as_deref().unwrap_or("unspecified")));

    let declared = obj.get("severity").and_then(Value::as_str);
    let severity = classify(&code, declared);

    let (timestamp, seconds) = resolve_timestamp(obj);

    AutoFailReason {
        violation: violation.unwrap_or_else(|| code.clone()),
        evidence: obj
            .get("evidence")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        timestamp,
        seconds,
        code,
        severity,
    }
}

/// A reason is a warning when its declared severity says so, or its code
/// is in the warning-only set — the set wins over any declaration.
fn classify(code: &str, declared: Option<&str>) -> Severity {
    if WARNING_ONLY_CODES.contains(&code) {
        return Severity::Warning;
    }
    match declared {
        Some(s) if s.eq_ignore_ascii_case("warning") => Severity::Warning,
        _ => Severity::Critical,
    }
}

/// Resolve a reason's timestamp field, which arrives as either a number
/// of seconds or a display string.
fn resolve_timestamp(obj: &Map<String, Value>) -> (Option<String>, Option<f64>) {
    for field in TIMESTAMP_FIELDS {
        let Some(raw) = obj.get(field) else { continue };
        let Ok(value) = serde_json::from_value::<NumOrStr>(raw.clone()) else {
            continue;
        };
        match value {
            NumOrStr::Num(n) if n.is_finite() && n >= 0.0 => {
                return (None, Some(n));
            }
            NumOrStr::Str(ref s) if !s.trim().is_empty() => {
                let seconds = value.as_seconds();
                return (Some(s.trim().to_string()), Some(seconds));
            }
            _ => {}
        }
    }
    (None, None)
}

/// Derive a stable machine code from free violation text.
fn slug_code(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars().take(48) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "unspecified".to_string()
    } else {
        slug
    }
}
