//! Per-item confidence estimation
//!
//! Produces a 50-100 triage signal for each checklist decision: how well
//! evidenced the automated call was, so reviewers can prioritize manual
//! spot checks. This is a reproducible heuristic, not a probability —
//! identical input always yields the identical score.
//!
//! # Scoring
//! Base 70, then purely additive, order-independent adjustments:
//!
//! | Signal | Adjustment |
//! |---|---|
//! | evidence length > 100 / > 50 / > 20 / absent | +15 / +10 / +5 / −10 |
//! | notes length > 80 / > 40 / > 0 | +10 / +7 / +3 |
//! | sub-checks mixed pass+fail / n-a majority / consistent | −10 / −5 / +5 |
//! | weight category Critical / High | +3 / +2 |
//! | notes mention AUTO-FAIL | +5 |
//! | notes or evidence mention PARTIAL | −5 |
//!
//! The result clamps to [50, 100]. Items with no sub-checks receive no
//! consistency adjustment.

use crate::types::{ChecklistItem, ItemStatus, WeightCategory};

/// Starting score before adjustments
const BASE: i32 = 70;

/// Lower and upper clamp bounds
const FLOOR: i32 = 50;
const CEILING: i32 = 100;

/// Estimate the confidence for one checklist item.
pub fn estimate(item: &ChecklistItem) -> u8 {
    let mut score = BASE;

    score += evidence_adjustment(item.evidence.as_deref());
    score += notes_adjustment(item.notes.as_deref());
    score += sub_check_adjustment(item);
    score += category_adjustment(item.weight_category);
    score += keyword_adjustment(item);

    score.clamp(FLOOR, CEILING) as u8
}

fn evidence_adjustment(evidence: Option<&str>) -> i32 {
    let len = evidence.map(str::len).unwrap_or(0);
    if len > 100 {
        15
    } else if len > 50 {
        10
    } else if len > 20 {
        5
    } else if len == 0 {
        -10
    } else {
        0
    }
}

fn notes_adjustment(notes: Option<&str>) -> i32 {
    let len = notes.map(str::len).unwrap_or(0);
    if len > 80 {
        10
    } else if len > 40 {
        7
    } else if len > 0 {
        3
    } else {
        0
    }
}

/// Sub-check consistency: mixed pass/fail undermines trust, an n-a
/// majority weakens it, uniform results strengthen it.
fn sub_check_adjustment(item: &ChecklistItem) -> i32 {
    if item.sub_checks.is_empty() {
        return 0;
    }

    let mut pass = 0usize;
    let mut fail = 0usize;
    let mut na = 0usize;
    for check in &item.sub_checks {
        match ItemStatus::classify(&check.status) {
            ItemStatus::Pass => pass += 1,
            ItemStatus::Fail => fail += 1,
            ItemStatus::NotApplicable => na += 1,
        }
    }

    if pass > 0 && fail > 0 {
        -10
    } else if na * 2 > item.sub_checks.len() {
        -5
    } else {
        5
    }
}

fn category_adjustment(category: WeightCategory) -> i32 {
    match category {
        WeightCategory::Critical => 3,
        WeightCategory::High => 2,
        WeightCategory::Standard => 0,
    }
}

fn keyword_adjustment(item: &ChecklistItem) -> i32 {
    let notes = item.notes.as_deref().unwrap_or("").to_uppercase();
    let evidence = item.evidence.as_deref().unwrap_or("").to_uppercase();

    let mut adjustment = 0;
    if notes.contains("AUTO-FAIL") {
        adjustment += 5;
    }
    if notes.contains("PARTIAL") || evidence.contains("PARTIAL") {
        adjustment -= 5;
    }
    adjustment
}
