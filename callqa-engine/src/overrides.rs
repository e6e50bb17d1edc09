//! Reviewer overrides
//!
//! Two layers of corrections can change an item's effective status:
//! ephemeral session overrides made by the reviewer currently looking at
//! the call, and persisted overrides written earlier through the
//! override collaborator and carried back to us inside the record's QA
//! notes. Resolution order is fixed: session > persisted > original.
//!
//! Overrides are keyed by the lowercased item name, not identity — the
//! same requirement re-normalized from a different upstream shape still
//! matches its override.

use crate::types::{OverrideSource, OverrideStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One persisted override as embedded in QA notes and as written through
/// the override collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedOverride {
    pub item_key: String,
    pub override_status: OverrideStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

/// The JSON blob a collaborator may embed in free-text QA notes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct QaNotesBlob {
    overrides: Vec<PersistedOverride>,
}

/// Both override layers, merged at read time
#[derive(Debug, Clone, Default)]
pub struct OverrideMap {
    session: HashMap<String, OverrideStatus>,
    persisted: HashMap<String, OverrideStatus>,
}

impl OverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ephemeral session layer and the persisted overrides
    /// recovered from QA notes. Keys are lowercased on insert.
    pub fn from_layers(
        session: &HashMap<String, OverrideStatus>,
        persisted: &[PersistedOverride],
    ) -> Self {
        let mut map = Self::new();
        for entry in persisted {
            map.persisted
                .insert(entry.item_key.to_lowercase(), entry.override_status);
        }
        for (key, status) in session {
            map.session.insert(key.to_lowercase(), *status);
        }
        map
    }

    /// Record a session override.
    pub fn set_session(&mut self, item_key: &str, status: OverrideStatus) {
        self.session.insert(item_key.to_lowercase(), status);
    }

    /// Resolve the override for an item key, if any. Session overrides
    /// outrank persisted ones.
    pub fn resolve(&self, item_key: &str) -> Option<(OverrideStatus, OverrideSource)> {
        let key = item_key.to_lowercase();
        if let Some(status) = self.session.get(&key) {
            return Some((*status, OverrideSource::Session));
        }
        if let Some(status) = self.persisted.get(&key) {
            return Some((*status, OverrideSource::Persisted));
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_empty() && self.persisted.is_empty()
    }
}

/// Extract persisted overrides from free-text QA notes.
///
/// The notes may be the JSON blob itself, prose with a blob embedded
/// somewhere inside, or plain prose with no blob at all. Malformed JSON
/// yields an empty set — logged, never an error.
pub fn parse_qa_notes(notes: Option<&str>) -> Vec<PersistedOverride> {
    let Some(notes) = notes else {
        return Vec::new();
    };
    let notes = notes.trim();
    if notes.is_empty() {
        return Vec::new();
    }

    // Plain prose with no object in it is normal, not malformed
    let (Some(start), Some(end)) = (notes.find('{'), notes.rfind('}')) else {
        return Vec::new();
    };

    // Whole-string parse first
    if let Ok(blob) = serde_json::from_str::<QaNotesBlob>(notes) {
        return blob.overrides;
    }

    // Otherwise the embedded object slice
    if start < end {
        if let Ok(blob) = serde_json::from_str::<QaNotesBlob>(&notes[start..=end]) {
            return blob.overrides;
        }
    }

    tracing::warn!("qa notes embed an unparseable override blob, ignoring");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_outranks_persisted() {
        let mut session = HashMap::new();
        session.insert("consent".to_string(), OverrideStatus::Fail);
        let persisted = vec![PersistedOverride {
            item_key: "Consent".to_string(),
            override_status: OverrideStatus::Pass,
            reviewed_by: Some("reviewer@example.com".to_string()),
        }];
        let map = OverrideMap::from_layers(&session, &persisted);
        assert_eq!(
            map.resolve("Consent"),
            Some((OverrideStatus::Fail, OverrideSource::Session))
        );
    }

    #[test]
    fn test_persisted_applies_when_no_session_layer() {
        let persisted = vec![PersistedOverride {
            item_key: "consent".to_string(),
            override_status: OverrideStatus::Pass,
            reviewed_by: None,
        }];
        let map = OverrideMap::from_layers(&HashMap::new(), &persisted);
        assert_eq!(
            map.resolve("CONSENT"),
            Some((OverrideStatus::Pass, OverrideSource::Persisted))
        );
    }

    #[test]
    fn test_unknown_key_resolves_to_none() {
        let map = OverrideMap::new();
        assert_eq!(map.resolve("greeting"), None);
    }

    #[test]
    fn test_parse_pure_json_notes() {
        let notes = r#"{"overrides":[{"itemKey":"consent","overrideStatus":"PASS","reviewedBy":"r1"}]}"#;
        let parsed = parse_qa_notes(Some(notes));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].item_key, "consent");
        assert_eq!(parsed[0].override_status, OverrideStatus::Pass);
        assert_eq!(parsed[0].reviewed_by.as_deref(), Some("r1"));
    }

    #[test]
    fn test_parse_blob_embedded_in_prose() {
        let notes = r#"Reviewed 2024-03-01. {"overrides":[{"itemKey":"greeting","overrideStatus":"FAIL"}]} Follow up next week."#;
        let parsed = parse_qa_notes(Some(notes));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].override_status, OverrideStatus::Fail);
    }

    #[test]
    fn test_plain_prose_yields_empty_set() {
        assert!(parse_qa_notes(Some("Agent sounded rushed, re-listen later.")).is_empty());
        assert!(parse_qa_notes(Some("")).is_empty());
        assert!(parse_qa_notes(None).is_empty());
    }

    #[test]
    fn test_malformed_json_yields_empty_set() {
        assert!(parse_qa_notes(Some(r#"{"overrides": [{"itemKey": }"#)).is_empty());
    }
}
