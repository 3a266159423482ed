// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record identifiers and key coercion between the two stores.
//!
//! The primary store keys every row by a plain string. The document store may
//! hold the same key either as that string or as a native document id, written
//! in extended JSON as `{"$oid": "<24 hex chars>"}`. Foreign keys inside
//! documents have the same ambiguity. Everything here reduces a stored key to
//! one canonical string so comparisons never depend on the representation.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

/// Extended JSON field carrying a native document id.
pub const OID_FIELD: &str = "$oid";

const ID_BYTES: usize = 12;
const ID_HEX_LEN: usize = ID_BYTES * 2;
const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

/// Errors from parsing a native document id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Wrong number of characters.
    #[error("document id must be 24 hex characters, got {0}")]
    InvalidLength(usize),
    /// Non-hex characters.
    #[error("document id contains non-hex characters")]
    InvalidHex,
}

/// Native 12-byte document identifier.
///
/// Layout: 4-byte big-endian UNIX seconds, 5 process-unique random bytes and
/// a 3-byte big-endian counter. Ids generated by one process sort by creation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId([u8; ID_BYTES]);

impl DocumentId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        let seconds = Utc::now().timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        let unique = PROCESS_UNIQUE.get_or_init(rand::random);
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK))
            .fetch_add(1, Ordering::Relaxed)
            & COUNTER_MASK;

        let mut bytes = [0u8; ID_BYTES];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Build an id from raw bytes.
    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the id.
    pub fn bytes(&self) -> [u8; ID_BYTES] {
        self.0
    }

    /// Parse the 24-character hex form (either letter case).
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.len() != ID_HEX_LEN {
            return Err(IdError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; ID_BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdError::InvalidHex)?;
        Ok(Self(bytes))
    }

    /// Lower-case hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time embedded in the id (second precision).
    pub fn timestamp(&self) -> DateTime<Utc> {
        let mut seconds = [0u8; 4];
        seconds.copy_from_slice(&self.0[..4]);
        DateTime::from_timestamp(i64::from(u32::from_be_bytes(seconds)), 0).unwrap_or_default()
    }

    /// Extended JSON representation (`{"$oid": "..."}`).
    pub fn to_native(&self) -> Value {
        json!({ OID_FIELD: self.to_hex() })
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Generate a new record key in its string form.
pub fn new_key() -> String {
    DocumentId::new().to_hex()
}

/// Canonical string form of a key given as text.
///
/// Keys that parse as native ids are lower-cased; anything else is an opaque
/// legacy key and kept verbatim.
pub fn canonical_key(key: &str) -> String {
    match DocumentId::parse(key) {
        Ok(id) => id.to_hex(),
        Err(_) => key.to_string(),
    }
}

/// Whether two textual keys refer to the same record.
pub fn same_key(a: &str, b: &str) -> bool {
    a == b || canonical_key(a) == canonical_key(b)
}

/// Collapse a stored key (string, native id or number) into its canonical form.
pub fn normalize_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(canonical_key(s)),
        Value::Object(map) => match map.get(OID_FIELD) {
            Some(Value::String(s)) => Some(canonical_key(s)),
            _ => None,
        },
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Representation to store a key under in a document: native when it parses
/// as a document id, plain string otherwise.
pub fn key_to_document(key: &str) -> Value {
    match DocumentId::parse(key) {
        Ok(id) => id.to_native(),
        Err(_) => Value::String(key.to_string()),
    }
}
