// Copyright (c) 2026 zkSL Labs and zkSealevel Contributors
// SPDX-License-Identifier: Apache-2.0

//! Canonical JSON encoding (JCS-like subset) and hex digest normalization.
//!
//! The canonical form sorts object keys byte-wise ascending, emits no
//! whitespace and no trailing newline, omits absent keys, and drops the
//! prototype-pollution key names at every nesting level. Numbers keep
//! `serde_json`'s standard literal form; integers stay integral literals.

use crate::error::{CoreError, CoreResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Key names that must never survive canonicalization.
const FORBIDDEN_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Serialize `v` into its canonical byte form.
pub fn canonical_json(v: &impl Serialize) -> CoreResult<Vec<u8>> {
    let value = serde_json::to_value(v).map_err(|_| CoreError::CanonicalEncoding)?;
    let sorted = sort_json(value);
    serde_json::to_vec(&sorted).map_err(|_| CoreError::CanonicalEncoding)
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(k, _)| !FORBIDDEN_KEYS.contains(&k.as_str()))
                .collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

/// A 32-byte digest carried as a 64-character hex string on the wire.
///
/// Accepts either case on input and normalizes to lowercase before any
/// hashing step; normalization is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hex32([u8; 32]);

impl Hex32 {
    pub fn parse(s: &str) -> CoreResult<Self> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidHexDigest);
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.to_ascii_lowercase(), &mut bytes)
            .map_err(|_| CoreError::InvalidHexDigest)?;
        Ok(Self(bytes))
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hex32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hex32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hex32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Hex32::parse(&raw).map_err(|_| D::Error::custom("expected a 64-character hex digest"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn sorted_compact_output() {
        let v = json!({"b": 1, "a": {"z": [1, 2], "y": "s"}});
        let bytes = canonical_json(&v).expect("canonical");
        assert_eq!(bytes, br#"{"a":{"y":"s","z":[1,2]},"b":1}"#);
    }

    #[test]
    fn no_trailing_newline() {
        let bytes = canonical_json(&json!({"k": null})).expect("canonical");
        assert_ne!(bytes.last(), Some(&b'\n'));
    }

    #[test]
    fn prototype_pollution_keys_dropped() {
        let v = json!({"__proto__": {"evil": 1}, "constructor": 2, "prototype": 3, "ok": {"prototype": 4}});
        let bytes = canonical_json(&v).expect("canonical");
        assert_eq!(bytes, br#"{"ok":{}}"#);
    }

    #[test]
    fn integers_stay_integral() {
        let bytes = canonical_json(&json!({"n": 42u64, "m": -7i64})).expect("canonical");
        assert_eq!(bytes, br#"{"m":-7,"n":42}"#);
    }

    #[test]
    fn hex32_rejects_bad_input() {
        assert!(Hex32::parse(&"G".repeat(64)).is_err());
        assert!(Hex32::parse(&"a".repeat(63)).is_err());
        assert!(Hex32::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn hex32_normalization_is_idempotent() {
        let upper = "AB".repeat(32);
        let once = Hex32::parse(&upper).expect("parse").to_hex();
        let twice = Hex32::parse(&once).expect("reparse").to_hex();
        assert_eq!(once, twice);
        assert_eq!(once, "ab".repeat(32));
    }

    fn arb_value(depth: u32) -> BoxedStrategy<serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-z0-9_]{0,12}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(depth, 24, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::Array),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
        .boxed()
    }

    proptest! {
        #[test]
        fn canonical_form_is_key_order_independent(v in arb_value(3)) {
            let forward = canonical_json(&v).expect("canonical");
            let reordered = match v {
                serde_json::Value::Object(map) => {
                    let mut entries: Vec<_> = map.into_iter().collect();
                    entries.reverse();
                    let mut out = serde_json::Map::new();
                    for (k, val) in entries {
                        out.insert(k, val);
                    }
                    serde_json::Value::Object(out)
                }
                other => other,
            };
            let backward = canonical_json(&reordered).expect("canonical");
            prop_assert_eq!(forward, backward);
        }
    }
}
