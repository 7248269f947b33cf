//! The persisted record: `{ content, changes: [{ start, end, suggestion }] }`.
//!
//! `content` is always the baseline. Field names are a compatibility surface
//! shared with existing stored documents and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::editing::{Patch, PatchLog};
use crate::error::SerializationError;

/// One serialized patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChange {
    pub start: usize,
    pub end: usize,
    /// The patch's replacement text
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub content: String,
    pub changes: Vec<StoredChange>,
}

impl StoredDocument {
    pub fn from_log(log: &PatchLog) -> Self {
        Self {
            content: log.baseline().to_string(),
            changes: serialize(log),
        }
    }
}

/// Result of reading a record: the surviving log and how many entries were dropped
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    pub log: PatchLog,
    pub dropped: usize,
}

/// Ordered patch list in persisted form
pub fn serialize(log: &PatchLog) -> Vec<StoredChange> {
    log.patches()
        .iter()
        .map(|patch| StoredChange {
            start: patch.start,
            end: patch.end,
            suggestion: patch.replacement.clone(),
        })
        .collect()
}

pub fn encode(log: &PatchLog) -> Result<Vec<u8>, SerializationError> {
    Ok(serde_json::to_vec_pretty(&StoredDocument::from_log(log))?)
}

/// Read a persisted record.
///
/// Only a record without a readable `content` string fails as a whole. Every
/// change entry is checked on its own (shape, bounds, character boundaries,
/// overlap with entries already kept) and dropped, not fatal, when invalid.
pub fn decode(bytes: &[u8]) -> Result<DecodedDocument, SerializationError> {
    let record: Value = serde_json::from_slice(bytes)?;
    let Some(content) = record.get("content").and_then(Value::as_str) else {
        return Err(SerializationError::MissingContent);
    };

    let entries: &[Value] = match record.get("changes") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(other) => {
            log::warn!("dropping non-array `changes` value: {other}");
            return Ok(DecodedDocument {
                log: PatchLog::new(content),
                dropped: 1,
            });
        }
    };

    let mut log = PatchLog::new(content);
    let mut dropped = 0;
    for (index, entry) in entries.iter().enumerate() {
        let change = match StoredChange::deserialize(entry) {
            Ok(change) => change,
            Err(err) => {
                log::warn!("dropping malformed change #{index}: {err}");
                dropped += 1;
                continue;
            }
        };
        match log.add_patch(Patch::new(change.start, change.end, change.suggestion)) {
            Ok(next) => log = next,
            Err(err) => {
                log::warn!("dropping invalid change #{index}: {err}");
                dropped += 1;
            }
        }
    }

    Ok(DecodedDocument { log, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fox_log() -> PatchLog {
        PatchLog::new("The quick fox jumps.")
            .add_patch(Patch::new(14, 19, "leaps"))
            .unwrap()
            .add_patch(Patch::new(4, 9, "slow"))
            .unwrap()
    }

    #[test]
    fn test_encode_uses_persisted_field_names() {
        let bytes = encode(&fox_log()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value,
            json!({
                "content": "The quick fox jumps.",
                "changes": [
                    { "start": 4, "end": 9, "suggestion": "slow" },
                    { "start": 14, "end": 19, "suggestion": "leaps" },
                ]
            })
        );
    }

    #[test]
    fn test_decode_restores_rendering() {
        let log = fox_log();
        let decoded = decode(&encode(&log).unwrap()).unwrap();

        assert_eq!(decoded.dropped, 0);
        assert_eq!(decoded.log.baseline(), log.baseline());
        assert_eq!(decoded.log.render(), "The slow fox leaps.");
    }

    #[test]
    fn test_decode_drops_malformed_entries_individually() {
        let record = json!({
            "content": "The quick fox jumps.",
            "changes": [
                { "start": 4, "end": 9, "suggestion": "slow" },
                { "start": -1, "end": 2, "suggestion": "negative" },
                { "start": 10, "suggestion": "missing end" },
                { "start": 6, "end": 12, "suggestion": "overlaps" },
                { "start": 12, "end": 11, "suggestion": "inverted" },
                { "start": 15, "end": 99, "suggestion": "out of bounds" },
                "not even an object",
                { "start": 14, "end": 19, "suggestion": "leaps" },
            ]
        });

        let decoded = decode(record.to_string().as_bytes()).unwrap();

        assert_eq!(decoded.dropped, 6);
        assert_eq!(decoded.log.len(), 2);
        assert_eq!(decoded.log.render(), "The slow fox leaps.");
    }

    #[test]
    fn test_decode_tolerates_missing_or_null_changes() {
        let missing = decode(br#"{ "content": "just text" }"#).unwrap();
        let null = decode(br#"{ "content": "just text", "changes": null }"#).unwrap();

        assert_eq!(missing.dropped, 0);
        assert!(missing.log.is_empty());
        assert_eq!(null.log.render(), "just text");
    }

    #[test]
    fn test_decode_non_array_changes_keeps_baseline() {
        let decoded = decode(br#"{ "content": "just text", "changes": "oops" }"#).unwrap();

        assert_eq!(decoded.dropped, 1);
        assert_eq!(decoded.log.render(), "just text");
    }

    #[test]
    fn test_decode_rejects_records_without_content() {
        assert!(matches!(
            decode(br#"{ "changes": [] }"#),
            Err(SerializationError::MissingContent)
        ));
        assert!(matches!(
            decode(br#"{ "content": 42 }"#),
            Err(SerializationError::MissingContent)
        ));
        assert!(matches!(decode(b"not json"), Err(SerializationError::Json(_))));
    }
}
