// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document representation shared by the document store backends.
//!
//! Documents are plain JSON objects in extended-JSON flavour. Reading one back
//! into a typed record goes through [`normalize_document`], which rewrites the
//! store-specific encodings (`_id`, `$oid`, `$date`) into the shapes the
//! serde models expect.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ids::{DocumentId, OID_FIELD, key_to_document, normalize_key};

/// Key field of every document.
pub const ID_FIELD: &str = "_id";

const DATE_FIELD: &str = "$date";

/// Comparison applied to one document field.
#[derive(Debug, Clone, PartialEq)]
enum Matcher {
    /// Stored key normalizes to this canonical key.
    Key(String),
    /// Stored value equals one of these values exactly.
    AnyOf(Vec<Value>),
    /// Stored string equals this one ignoring ASCII case.
    IgnoreCase(String),
    /// Field is absent, null or false.
    Falsy,
}

/// Conjunction of field conditions over a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Matcher)>,
}

impl Filter {
    /// Filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match on a key field, whatever representation it is stored in.
    pub fn by_key(field: &str, key: &str) -> Self {
        Self::new().key(field, key)
    }

    /// Add a key condition.
    pub fn key(mut self, field: &str, key: &str) -> Self {
        let canonical = crate::ids::canonical_key(key);
        self.conditions
            .push((field.to_string(), Matcher::Key(canonical)));
        self
    }

    /// Add an exact-equality condition.
    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.any_of(field, vec![value.into()])
    }

    /// Add a condition matching any of several exact values.
    pub fn any_of(mut self, field: &str, values: Vec<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Matcher::AnyOf(values)));
        self
    }

    /// Add a case-insensitive string condition (enum values are stored in
    /// whatever case the writer used).
    pub fn eq_ignore_case(mut self, field: &str, value: &str) -> Self {
        self.conditions
            .push((field.to_string(), Matcher::IgnoreCase(value.to_string())));
        self
    }

    /// Add a condition requiring the field to be missing, null or false.
    pub fn falsy(mut self, field: &str) -> Self {
        self.conditions.push((field.to_string(), Matcher::Falsy));
        self
    }

    /// The canonical key this filter pins `_id` to, if any.
    pub fn id_key(&self) -> Option<&str> {
        self.conditions.iter().find_map(|(field, matcher)| match matcher {
            Matcher::Key(key) if field == ID_FIELD => Some(key.as_str()),
            _ => None,
        })
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a stored document satisfies every condition.
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|(field, matcher)| {
            let stored = document.get(field.as_str());
            match matcher {
                Matcher::Key(key) => stored
                    .and_then(normalize_key)
                    .is_some_and(|stored_key| stored_key == *key),
                Matcher::AnyOf(values) => stored.is_some_and(|v| values.contains(v)),
                Matcher::IgnoreCase(expected) => stored
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case(expected)),
                Matcher::Falsy => matches!(stored, None | Some(Value::Null) | Some(Value::Bool(false))),
            }
        })
    }
}

/// Canonical key of a stored document.
pub fn document_key(document: &Value) -> Option<String> {
    document.get(ID_FIELD).and_then(normalize_key)
}

/// Rewrite a stored document into the shape typed records deserialize from.
///
/// - `_id` becomes `id`
/// - `{"$oid": ..}` becomes the canonical key string
/// - `{"$date": ..}` (RFC 3339 string or epoch millis) becomes an RFC 3339 string
/// - a missing `createdAt` is recovered from a native `_id`
/// - a missing `updatedAt` copies `createdAt`
pub fn normalize_document(document: Value) -> Value {
    let Value::Object(mut map) = document else {
        return document;
    };

    let native_created = map
        .get(ID_FIELD)
        .and_then(Value::as_object)
        .and_then(|oid| oid.get(OID_FIELD))
        .and_then(Value::as_str)
        .and_then(|hex| DocumentId::parse(hex).ok())
        .map(|id| id.timestamp());

    if let Some(id) = map.remove(ID_FIELD) {
        map.entry("id").or_insert(id);
    }

    let mut map: Map<String, Value> = map
        .into_iter()
        .map(|(k, v)| (k, normalize_value(v)))
        .collect();

    if !map.contains_key("createdAt")
        && let Some(created) = native_created
    {
        map.insert("createdAt".to_string(), Value::String(created.to_rfc3339()));
    }
    if !map.contains_key("updatedAt")
        && let Some(created) = map.get("createdAt").cloned()
    {
        map.insert("updatedAt".to_string(), created);
    }

    Value::Object(map)
}

fn normalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.contains_key(OID_FIELD) => {
            let raw = Value::Object(map);
            match normalize_key(&raw) {
                Some(key) => Value::String(key),
                None => raw,
            }
        }
        Value::Object(map) if map.len() == 1 && map.contains_key(DATE_FIELD) => {
            match map.get(DATE_FIELD).and_then(date_from_extended) {
                Some(date) => Value::String(date.to_rfc3339()),
                None => Value::Object(map),
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_value(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        other => other,
    }
}

fn date_from_extended(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::Object(inner) => inner
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Decode a stored document into a typed record.
pub fn decode_document<T: DeserializeOwned>(document: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(normalize_document(document))
}

/// Encode a typed record as a document, keyed by `_id`.
///
/// The key is stored natively when it parses as a document id.
pub fn encode_record<T: Serialize>(record: &T) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value
        && let Some(Value::String(id)) = map.remove("id")
    {
        map.insert(ID_FIELD.to_string(), key_to_document(&id));
    }
    Ok(value)
}

/// Fields of an encoded record to `$set` on update (everything but the key).
pub fn update_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match encode_record(record)? {
        Value::Object(mut map) => {
            map.remove(ID_FIELD);
            Ok(map)
        }
        _ => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        id: String,
        owner_id: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    #[test]
    fn test_filter_key_matches_both_representations() {
        let filter = Filter::by_key("ownerId", "65F1A2B3C4D5E6F708091011");
        assert!(filter.matches(&json!({"ownerId": "65f1a2b3c4d5e6f708091011"})));
        assert!(filter.matches(&json!({"ownerId": {"$oid": "65f1a2b3c4d5e6f708091011"}})));
        assert!(!filter.matches(&json!({"ownerId": "65f1a2b3c4d5e6f708091012"})));
        assert!(!filter.matches(&json!({"other": "65f1a2b3c4d5e6f708091011"})));
    }

    #[test]
    fn test_filter_ignore_case_and_conjunction() {
        let filter = Filter::new()
            .eq_ignore_case("status", "OPEN")
            .eq("remote", true);
        assert!(filter.matches(&json!({"status": "open", "remote": true})));
        assert!(!filter.matches(&json!({"status": "open", "remote": false})));
        assert!(!filter.matches(&json!({"status": "CLOSED", "remote": true})));
    }

    #[test]
    fn test_filter_falsy() {
        let filter = Filter::new().falsy("read");
        assert!(filter.matches(&json!({})));
        assert!(filter.matches(&json!({"read": null})));
        assert!(filter.matches(&json!({"read": false})));
        assert!(!filter.matches(&json!({"read": true})));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&json!({"anything": 1})));
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn test_id_key() {
        let filter = Filter::by_key(ID_FIELD, "ABCDEF0123456789ABCDEF01").eq("x", 1);
        assert_eq!(filter.id_key(), Some("abcdef0123456789abcdef01"));
        assert_eq!(Filter::by_key("ownerId", "k").id_key(), None);
    }

    #[test]
    fn test_normalize_native_document() {
        let doc = json!({
            "_id": {"$oid": "65f1a2b3c4d5e6f708091011"},
            "ownerId": {"$oid": "65F1A2B3C4D5E6F708091012"},
            "tags": [{"$oid": "65f1a2b3c4d5e6f708091013"}],
        });
        let normalized = normalize_document(doc);
        assert_eq!(normalized["id"], json!("65f1a2b3c4d5e6f708091011"));
        assert_eq!(normalized["ownerId"], json!("65f1a2b3c4d5e6f708091012"));
        assert_eq!(normalized["tags"][0], json!("65f1a2b3c4d5e6f708091013"));
        assert!(normalized.get("_id").is_none());
        // createdAt recovered from the id timestamp, updatedAt copied from it
        let created = normalized["createdAt"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(created).unwrap();
        assert_eq!(parsed.timestamp(), 0x65f1_a2b3);
        assert_eq!(normalized["updatedAt"], normalized["createdAt"]);
    }

    #[test]
    fn test_normalize_dates() {
        let doc = json!({
            "_id": "legacy-1",
            "createdAt": {"$date": 1_700_000_000_000_i64},
            "updatedAt": {"$date": "2024-03-01T10:00:00Z"},
            "deadline": {"$date": {"$numberLong": "1700000000000"}},
        });
        let normalized = normalize_document(doc);
        assert_eq!(normalized["id"], json!("legacy-1"));
        let created = DateTime::parse_from_rfc3339(normalized["createdAt"].as_str().unwrap())
            .unwrap();
        assert_eq!(created.timestamp(), 1_700_000_000);
        assert!(normalized["updatedAt"].as_str().unwrap().starts_with("2024-03-01T10:00:00"));
        assert!(normalized["deadline"].is_string());
    }

    #[test]
    fn test_decode_and_encode_record() {
        let doc = json!({
            "_id": {"$oid": "65f1a2b3c4d5e6f708091011"},
            "ownerId": "user-1",
            "createdAt": "2024-01-01T00:00:00Z",
        });
        let sample: Sample = decode_document(doc).unwrap();
        assert_eq!(sample.id, "65f1a2b3c4d5e6f708091011");
        assert_eq!(sample.updated_at, sample.created_at);

        let encoded = encode_record(&sample).unwrap();
        assert_eq!(encoded["_id"], json!({"$oid": "65f1a2b3c4d5e6f708091011"}));
        assert!(encoded.get("id").is_none());
        assert_eq!(document_key(&encoded).as_deref(), Some("65f1a2b3c4d5e6f708091011"));

        let fields = update_fields(&sample).unwrap();
        assert!(!fields.contains_key(ID_FIELD));
        assert_eq!(fields["ownerId"], json!("user-1"));
    }
}
