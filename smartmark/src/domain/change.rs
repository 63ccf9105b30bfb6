// smartmark/src/domain/change.rs
//! Change-feed payloads.
//!
//! Wire shape: `{"eventType": "INSERT", "new": {...}, "old": {...}}`. Feeds
//! commonly send `{}` instead of `null` for the side that does not apply, so
//! both are read as absent.

use crate::domain::bookmark::{Bookmark, BookmarkId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeKind {
    Insert,
    Delete,
    Update,
    Other(String),
}

impl From<String> for ChangeKind {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "INSERT" => ChangeKind::Insert,
            "DELETE" => ChangeKind::Delete,
            "UPDATE" => ChangeKind::Update,
            _ => ChangeKind::Other(value),
        }
    }
}

impl From<ChangeKind> for String {
    fn from(kind: ChangeKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => f.write_str("INSERT"),
            ChangeKind::Delete => f.write_str("DELETE"),
            ChangeKind::Update => f.write_str("UPDATE"),
            ChangeKind::Other(other) => f.write_str(other),
        }
    }
}

/// Identifier-bearing part of a removed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: BookmarkId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventType")]
    pub event_type: ChangeKind,
    #[serde(default, deserialize_with = "record_or_empty")]
    pub new: Option<Bookmark>,
    #[serde(default, deserialize_with = "record_or_empty")]
    pub old: Option<RecordKey>,
}

impl ChangeEvent {
    pub fn insert(bookmark: Bookmark) -> Self {
        Self {
            event_type: ChangeKind::Insert,
            new: Some(bookmark),
            old: None,
        }
    }

    pub fn delete(id: BookmarkId) -> Self {
        Self {
            event_type: ChangeKind::Delete,
            new: None,
            old: Some(RecordKey { id }),
        }
    }
}

fn record_or_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_insert_payload_when_deserialize_then_reads_full_record() {
        let json = r#"{
            "eventType": "INSERT",
            "new": {"id": 5, "user_id": "u1", "title": "Example",
                    "url": "https://example.com", "created_at": "2025-06-01T10:00:00Z"},
            "old": {}
        }"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, ChangeKind::Insert);
        assert_eq!(event.new.unwrap().id, BookmarkId::new(5));
        assert_eq!(event.old, None);
    }

    #[test]
    fn given_delete_payload_with_only_id_when_deserialize_then_reads_key() {
        let json = r#"{"eventType": "DELETE", "new": {}, "old": {"id": 9}}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, ChangeKind::Delete);
        assert_eq!(event.new, None);
        assert_eq!(event.old, Some(RecordKey { id: BookmarkId::new(9) }));
    }

    #[test]
    fn given_unknown_event_type_when_deserialize_then_kept_as_other() {
        let json = r#"{"eventType": "TRUNCATE"}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, ChangeKind::Other("TRUNCATE".to_string()));
    }

    #[test]
    fn given_delete_event_when_serialize_then_uses_wire_names() {
        let value = serde_json::to_value(ChangeEvent::delete(BookmarkId::new(3))).unwrap();
        assert_eq!(value["eventType"], "DELETE");
        assert_eq!(value["old"]["id"], 3);
        assert!(value["new"].is_null());
    }
}
