//! Tolerant clock parsing and formatting for call-audit timestamps
//!
//! Upstream audit payloads carry timestamps in several spellings: bare
//! clock strings (`3:45`, `1:02:07`), bracketed tokens (`[0:32]`,
//! `(12:05)`), second counts (`45s`, `45 seconds`), and ranges
//! (`0:20-0:49`). All parsing here is lossy-but-total: anything
//! unrecognizable resolves to `0.0` rather than an error, so callers can
//! keep deriving a timeline from partially broken input.
//!
//! # Conversion Flow
//!
//! ```text
//! Raw display string ("0:20-0:49")
//!     ↓
//! parse_timestamp() → seconds (f64, never fails)
//!     ↓
//! position math (seconds / duration × 100)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Clock token: `M:SS` or `H:MM:SS`, found anywhere in the input
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})(?::(\d{2}))?").expect("clock regex"));

/// Strict clock form used by checklist field resolution: `M:SS` only
static CLOCK_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}$").expect("strict clock regex"));

/// Second-count form: `45s`, `45 sec`, `45 seconds`
static SECONDS_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*(?:s|sec|secs|seconds)$").expect("seconds regex")
});

/// Bracketed clock embedded in free text: `[M:SS]`
static EMBEDDED_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{1,2}):(\d{2})\]").expect("embedded clock regex"));

/// Parse a display timestamp into seconds, tolerating every upstream
/// spelling. Never fails: unrecognizable input resolves to `0.0`.
///
/// Accepted forms, in resolution order:
/// 1. Surrounding brackets/parens are stripped (`[0:32]` → `0:32`)
/// 2. Ranges take their start (`0:20-0:49` → `0:20`)
/// 3. Second counts (`45s`, `45 seconds`)
/// 4. Clock tokens (`M:SS`, `H:MM:SS`) found anywhere in the string
/// 5. Bare numbers (`90` → 90.0)
///
/// # Examples
///
/// ```
/// use callqa_common::time::parse_timestamp;
///
/// assert_eq!(parse_timestamp("0:20"), 20.0);
/// assert_eq!(parse_timestamp("1:02:07"), 3727.0);
/// assert_eq!(parse_timestamp("[0:32]"), 32.0);
/// assert_eq!(parse_timestamp("0:20-0:49"), 20.0);
/// assert_eq!(parse_timestamp("45 seconds"), 45.0);
/// assert_eq!(parse_timestamp("garbage"), 0.0);
/// ```
pub fn parse_timestamp(raw: &str) -> f64 {
    let mut s = raw.trim();

    // Strip one layer of surrounding brackets or parens
    if (s.starts_with('[') && s.ends_with(']')) || (s.starts_with('(') && s.ends_with(')')) {
        s = s[1..s.len() - 1].trim();
    }

    if s.is_empty() {
        return 0.0;
    }

    // Ranges take the start: "0:20-0:49" → "0:20"
    if let Some((start, _)) = s.split_once('-') {
        let start = start.trim();
        if !start.is_empty() {
            return parse_timestamp(start);
        }
    }

    // Second counts: "45s", "45 seconds"
    if let Some(caps) = SECONDS_SUFFIX.captures(s) {
        if let Ok(n) = caps[1].parse::<f64>() {
            return n;
        }
    }

    // Clock token anywhere in the string
    if let Some(secs) = find_clock(s) {
        return secs;
    }

    // Bare number of seconds
    if let Ok(n) = s.parse::<f64>() {
        if n.is_finite() && n >= 0.0 {
            return n;
        }
    }

    0.0
}

/// Parse a strict `M:SS` clock string, the only form accepted when
/// resolving checklist time fields. Returns `None` for anything else.
pub fn parse_clock_strict(s: &str) -> Option<f64> {
    let s = s.trim();
    if !CLOCK_STRICT.is_match(s) {
        return None;
    }
    find_clock(s)
}

/// Find the first clock token (`M:SS` or `H:MM:SS`) in a string and
/// convert it to seconds.
pub fn find_clock(s: &str) -> Option<f64> {
    let caps = CLOCK.captures(s)?;
    let first: f64 = caps[1].parse().ok()?;
    let second: f64 = caps[2].parse().ok()?;
    match caps.get(3) {
        // H:MM:SS
        Some(third) => {
            let third: f64 = third.as_str().parse().ok()?;
            Some(first * 3600.0 + second * 60.0 + third)
        }
        // M:SS
        None => Some(first * 60.0 + second),
    }
}

/// Extract a bracketed `[M:SS]` timestamp embedded in free text
/// (evidence excerpts quote the recording this way).
pub fn embedded_timestamp(text: &str) -> Option<f64> {
    let caps = EMBEDDED_CLOCK.captures(text)?;
    let minutes: f64 = caps[1].parse().ok()?;
    let seconds: f64 = caps[2].parse().ok()?;
    Some(minutes * 60.0 + seconds)
}

/// Format seconds as an `M:SS` display clock.
///
/// Negative and non-finite input clamps to `0:00`.
///
/// # Examples
///
/// ```
/// use callqa_common::time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(20.0), "0:20");
/// assert_eq!(format_clock(330.0), "5:30");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_forms() {
        assert_eq!(parse_timestamp("0:20"), 20.0);
        assert_eq!(parse_timestamp("5:30"), 330.0);
        assert_eq!(parse_timestamp("1:02:07"), 3727.0);
    }

    #[test]
    fn test_parse_bracketed() {
        assert_eq!(parse_timestamp("[0:32]"), 32.0);
        assert_eq!(parse_timestamp("(12:05)"), 725.0);
        assert_eq!(parse_timestamp("  [1:00]  "), 60.0);
    }

    #[test]
    fn test_parse_range_takes_start() {
        // Range start wins
        assert_eq!(parse_timestamp("0:20-0:49"), 20.0);
        assert_eq!(parse_timestamp("1:00 - 2:00"), 60.0);
    }

    #[test]
    fn test_parse_second_counts() {
        assert_eq!(parse_timestamp("45s"), 45.0);
        assert_eq!(parse_timestamp("45 seconds"), 45.0);
        assert_eq!(parse_timestamp("12 SEC"), 12.0);
        assert_eq!(parse_timestamp("90"), 90.0);
    }

    #[test]
    fn test_parse_never_fails() {
        assert_eq!(parse_timestamp(""), 0.0);
        assert_eq!(parse_timestamp("garbage"), 0.0);
        assert_eq!(parse_timestamp("::"), 0.0);
        assert_eq!(parse_timestamp("-5"), 0.0);
    }

    #[test]
    fn test_strict_clock() {
        assert_eq!(parse_clock_strict("3:45"), Some(225.0));
        assert_eq!(parse_clock_strict(" 0:07 "), Some(7.0));
        assert_eq!(parse_clock_strict("1:02:07"), None);
        assert_eq!(parse_clock_strict("345"), None);
        assert_eq!(parse_clock_strict("3:456"), None);
    }

    #[test]
    fn test_embedded_timestamp() {
        assert_eq!(
            embedded_timestamp("Agent confirmed consent at [2:15] on the recording"),
            Some(135.0)
        );
        assert_eq!(embedded_timestamp("no timestamp here"), None);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(7.0), "0:07");
        assert_eq!(format_clock(330.0), "5:30");
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }
}
