//! Canonical JSON encoding for hashed and signed payloads.
//!
//! Objects are written compactly with keys in lexicographic order. Keys are
//! fed through a `BTreeMap` and inserted into the output object in that order,
//! so the result does not depend on whether serde_json keeps insertion order.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub fn to_canonical_json(fields: BTreeMap<&str, Value>) -> String {
    let object: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    Value::Object(object).to_string()
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Serde adapter writing 32-byte hashes as lowercase hex strings.
pub mod hex_hash {
    use crate::crypto::Sha256Hash;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sha256Hash, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut hash = [0u8; 32];
        hex::decode_to_slice(&encoded, &mut hash).map_err(de::Error::custom)?;
        Ok(hash)
    }
}
