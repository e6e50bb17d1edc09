//! Weighted compliance scoring
//!
//! Applies the static weight table and override resolution to the
//! normalized checklist, producing earned/possible points, the final
//! percentage, and an auditable per-item breakdown.
//!
//! # Weight lookup
//!
//! Case-insensitive substring match between the item name and each table
//! key; the first match in table-definition order wins, so more specific
//! keys sit above broader ones. Unmatched items fall back to the default
//! weight — an item is never excluded for missing its category.
//!
//! | Key | Weight | Category |
//! |---|---|---|
//! | recording disclosure | 25 | Critical |
//! | do not call | 20 | Critical |
//! | dnc | 20 | Critical |
//! | identity verification | 20 | Critical |
//! | consent | 20 | Critical |
//! | eligibility | 15 | High |
//! | pricing | 15 | High |
//! | plan details | 15 | High |
//! | transfer | 10 | Standard |
//! | greeting | 5 | Standard |
//! | closing | 5 | Standard |
//! | (unmatched) | 10 | Standard |

use crate::overrides::OverrideMap;
use crate::types::{
    AutoFailEvaluation, ChecklistItem, ItemStatus, OverrideSource, Scorecard, ScoreStep,
    WeightCategory,
};

/// Weight applied to items no table key matches
pub const DEFAULT_WEIGHT: u32 = 10;

/// Static weight table; first substring match in this order wins
pub const WEIGHT_TABLE: [(&str, u32, WeightCategory); 11] = [
    ("recording disclosure", 25, WeightCategory::Critical),
    ("do not call", 20, WeightCategory::Critical),
    ("dnc", 20, WeightCategory::Critical),
    ("identity verification", 20, WeightCategory::Critical),
    ("consent", 20, WeightCategory::Critical),
    ("eligibility", 15, WeightCategory::High),
    ("pricing", 15, WeightCategory::High),
    ("plan details", 15, WeightCategory::High),
    ("transfer", 10, WeightCategory::Standard),
    ("greeting", 5, WeightCategory::Standard),
    ("closing", 5, WeightCategory::Standard),
];

/// Look up an item's weight and category by requirement name.
pub fn weight_for(name: &str) -> (u32, WeightCategory) {
    let name = name.to_lowercase();
    for (key, weight, category) in WEIGHT_TABLE {
        if name.contains(key) {
            return (weight, category);
        }
    }
    (DEFAULT_WEIGHT, WeightCategory::Standard)
}

/// An item's status after override resolution: session override >
/// persisted override > original status.
pub fn effective_status(
    item: &ChecklistItem,
    overrides: &OverrideMap,
) -> (ItemStatus, Option<OverrideSource>) {
    match overrides.resolve(&item.key()) {
        Some((status, source)) => (status.as_item_status(), Some(source)),
        None => (item.status, None),
    }
}

/// Score the normalized checklist.
///
/// n/a items are skipped entirely; every other item contributes its
/// weight to `possible` and, when met, to `earned`. An empty checklist
/// scores 0 out of 0 — never an error.
pub fn score(
    items: &[ChecklistItem],
    overrides: &OverrideMap,
    auto_fail: &AutoFailEvaluation,
    auto_fail_override: bool,
) -> Scorecard {
    let mut steps = Vec::with_capacity(items.len());
    let mut earned = 0u32;
    let mut possible = 0u32;

    for item in items {
        if item.status == ItemStatus::NotApplicable {
            continue;
        }

        let (weight, category) = weight_for(&item.name);
        let (status, override_source) = effective_status(item, overrides);
        let met = status.is_met();

        possible += weight;
        if met {
            earned += weight;
        }

        steps.push(ScoreStep {
            name: item.name.clone(),
            weight,
            category,
            status,
            met,
            override_source,
            confidence: item.confidence,
        });
    }

    let score_percent = if possible == 0 {
        0
    } else {
        ((100.0 * earned as f64) / possible as f64).round() as u32
    };

    let auto_fail_applied = auto_fail.triggered && !auto_fail_override;
    let auto_fail_overridden = auto_fail.triggered && auto_fail_override;
    let display_score = if auto_fail_applied { 0 } else { score_percent };

    tracing::debug!(
        earned,
        possible,
        score_percent,
        display_score,
        auto_fail_applied,
        "scoring pass complete"
    );

    Scorecard {
        steps,
        earned,
        possible,
        score_percent,
        display_score,
        auto_fail_applied,
        auto_fail_overridden,
    }
}
