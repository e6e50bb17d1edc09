//! Transcript diarization
//!
//! Parses raw transcript text into timestamped turns and infers a
//! speaker role (agent vs. prospect) for every line.
//!
//! # Pass 1 — line parsing
//! Each non-empty line sheds a leading `[M:SS]`/`(M:SS)` token, then a
//! leading `Label:` prefix; a line with no leading label may instead
//! carry a trailing `Label [M:SS]`. Lines missing a timestamp or label
//! inherit the most recently seen value (continuation semantics), seeded
//! with `0:00` / `Unknown`.
//!
//! # Pass 2 — role resolution
//! Labels are trusted first: a label containing a fragment of the known
//! agent's name or an agent/prospect keyword resolves the role outright,
//! with no lexical scoring. Anything else gets a signed semantic score
//! from a fixed, ordered rule set; the score is compared against the
//! configured symmetric thresholds and ambiguous lines inherit the
//! previous line's role (the very first defaults to prospect).
//!
//! The thresholds are empirically tuned, not principled — they live in
//! `EngineParams` rather than here.

use crate::types::{SpeakerRole, TimelineMarker, TranscriptTurn};
use callqa_common::config::EngineParams;
use once_cell::sync::Lazy;
use regex::Regex;

/// Leading timestamp token: `3:45`, `[3:45]`, `(3:45)`
static LEADING_TS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\(\[]?(\d{1,2}:\d{2})[\)\]]?\s*").expect("leading ts regex"));

/// Leading speaker label up to the first colon
static LEADING_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9 .'_-]{0,40}):\s*").expect("label regex"));

/// Trailing `Label [M:SS]` form some exporters produce
static TRAILING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9 .'_-]{0,40})\s*\[(\d{1,2}):(\d{2})\]\s*$")
        .expect("trailing label regex")
});

/// Label keywords that resolve to agent without scoring
const AGENT_LABEL_KEYWORDS: [&str; 3] = ["agent", "rep", "specialist"];

/// Label keywords that resolve to prospect without scoring
const PROSPECT_LABEL_KEYWORDS: [&str; 3] = ["customer", "prospect", "caller"];

/// Compliance/disclosure phrasing only the agent reads
const DISCLOSURE_PHRASES: [&str; 5] = [
    "recorded line",
    "call is being recorded",
    "quality assurance",
    "do-not-call",
    "privacy policy",
];

/// Sales-script phrasing
const SCRIPT_PHRASES: [&str; 5] = [
    "great opportunity",
    "at no cost",
    "what we offer",
    "you qualify for",
    "let me go over",
];

/// Verification questions the agent asks
const VERIFICATION_PHRASES: [&str; 5] = [
    "can you confirm",
    "can you verify",
    "date of birth",
    "last four",
    "could you spell",
];

/// Handoff/transfer phrasing
const HANDOFF_PHRASES: [&str; 4] = [
    "transfer you",
    "stay on the line",
    "licensed specialist",
    "my supervisor",
];

/// Short affirmatives typical of the counterparty
const SHORT_AFFIRMATIVES: [&str; 9] = [
    "yes", "yeah", "yep", "no", "ok", "okay", "sure", "uh-huh", "alright",
];

/// Self-identification answers to "may I speak with …"
const SELF_ID_PHRASES: [&str; 4] = ["this is he", "this is she", "speaking", "who's calling"];

/// Objection phrasing
const OBJECTION_PHRASES: [&str; 5] = [
    "not interested",
    "stop calling",
    "take me off",
    "remove me from",
    "how did you get",
];

/// One parsed line before role resolution
struct ParsedLine {
    label: String,
    start: f64,
    content: String,
}

/// Diarize a raw transcript.
///
/// Deterministic for identical (transcript, agent name, thresholds):
/// no randomness, no ambient state.
pub fn diarize(
    transcript: &str,
    agent_name: Option<&str>,
    markers: &[TimelineMarker],
    params: &EngineParams,
) -> Vec<TranscriptTurn> {
    let lines = parse_lines(transcript);
    let mut turns = Vec::with_capacity(lines.len());

    let mut previous_role = SpeakerRole::Prospect;
    for (index, line) in lines.iter().enumerate() {
        let role = match definitive_role(&line.label, agent_name) {
            Some(role) => role,
            None => {
                let score = semantic_score(&line.content);
                if score >= params.agent_threshold {
                    SpeakerRole::Agent
                } else if score <= params.prospect_threshold {
                    SpeakerRole::Prospect
                } else {
                    // Ambiguous: inherit; the very first line defaults to
                    // prospect via the seed
                    previous_role
                }
            }
        };
        previous_role = role;

        let start = line.start;
        let end = match lines.get(index + 1) {
            Some(next) => next.start.max(start),
            None => start + params.last_turn_padding_seconds,
        };

        let associated_markers = markers
            .iter()
            .filter(|m| m.seconds >= start && m.seconds < end)
            .cloned()
            .collect();

        turns.push(TranscriptTurn {
            speaker_label: line.label.clone(),
            role,
            content: line.content.clone(),
            start_seconds: start,
            end_seconds: end,
            associated_markers,
        });
    }

    turns
}

/// Pass 1: split lines, strip tokens, carry forward missing values.
fn parse_lines(transcript: &str) -> Vec<ParsedLine> {
    let mut lines = Vec::new();
    let mut last_label = "Unknown".to_string();
    let mut last_start = 0.0_f64;

    for raw in transcript.lines() {
        let mut rest = raw.trim();
        if rest.is_empty() {
            continue;
        }

        let mut start: Option<f64> = None;
        let mut label: Option<String> = None;

        if let Some(caps) = LEADING_TS.captures(rest) {
            start = clock_seconds(&caps[1]);
            rest = &rest[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
        }

        if let Some(caps) = LEADING_LABEL.captures(rest) {
            let candidate = caps[1].trim();
            // A real label is short; a clause that happens to end in a
            // colon is not
            if word_count(candidate) <= 4 {
                label = Some(candidate.to_string());
                rest = &rest[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
            }
        }

        let mut content = rest.trim().to_string();

        if label.is_none() {
            if let Some(caps) = TRAILING_LABEL.captures(&content) {
                let candidate = caps[1].trim().to_string();
                if word_count(&candidate) <= 4 {
                    if start.is_none() {
                        let minutes: f64 = caps[2].parse().unwrap_or(0.0);
                        let seconds: f64 = caps[3].parse().unwrap_or(0.0);
                        start = Some(minutes * 60.0 + seconds);
                    }
                    let cut = caps.get(0).map(|m| m.start()).unwrap_or(content.len());
                    content = content[..cut].trim().to_string();
                    label = Some(candidate);
                }
            }
        }

        // Continuation semantics: inherit what this line did not carry
        let label = label.unwrap_or_else(|| last_label.clone());
        let start = start.unwrap_or(last_start);
        last_label = label.clone();
        last_start = start;

        if content.is_empty() {
            continue;
        }

        lines.push(ParsedLine {
            label,
            start,
            content,
        });
    }

    lines
}

fn clock_seconds(token: &str) -> Option<f64> {
    let (m, s) = token.split_once(':')?;
    let minutes: f64 = m.parse().ok()?;
    let seconds: f64 = s.parse().ok()?;
    Some(minutes * 60.0 + seconds)
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// A definitive label is trusted outright: agent-name fragments and role
/// keywords short-circuit lexical scoring entirely.
fn definitive_role(label: &str, agent_name: Option<&str>) -> Option<SpeakerRole> {
    let label = label.to_lowercase();

    if let Some(name) = agent_name {
        for fragment in name
            .to_lowercase()
            .split_whitespace()
            .filter(|f| f.len() >= 3)
        {
            if label.contains(fragment) {
                return Some(SpeakerRole::Agent);
            }
        }
    }

    if AGENT_LABEL_KEYWORDS.iter().any(|kw| label.contains(kw)) {
        return Some(SpeakerRole::Agent);
    }
    if PROSPECT_LABEL_KEYWORDS.iter().any(|kw| label.contains(kw)) {
        return Some(SpeakerRole::Prospect);
    }
    None
}

/// Signed semantic score over the fixed rule set. Each rule fires at
/// most once; the rules are commutative so evaluation order only matters
/// for readability.
fn semantic_score(content: &str) -> i32 {
    let text = content.to_lowercase();
    let mut score = 0;

    // Long monologues lean agent
    if content.len() > 160 {
        score += 2;
    }

    if contains_any(&text, &DISCLOSURE_PHRASES) {
        score += 3;
    }
    if contains_any(&text, &SCRIPT_PHRASES) {
        score += 2;
    }
    if contains_any(&text, &VERIFICATION_PHRASES) {
        score += 3;
    }
    if contains_any(&text, &HANDOFF_PHRASES) {
        score += 2;
    }

    if is_short_affirmative(&text) {
        score -= 2;
    }
    if contains_any(&text, &SELF_ID_PHRASES) {
        score -= 3;
    }
    if contains_any(&text, &OBJECTION_PHRASES) {
        score -= 3;
    }

    score
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn is_short_affirmative(text: &str) -> bool {
    let trimmed = text.trim_end_matches(['.', '!', '?', ',']);
    trimmed.len() <= 12
        && SHORT_AFFIRMATIVES
            .iter()
            .any(|a| trimmed == *a || trimmed.starts_with(&format!("{a} ")) || trimmed.starts_with(&format!("{a},")))
}
