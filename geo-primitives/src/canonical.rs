/// Canonicalized parameter encoding for fingerprinting.
///
/// Dynamic parameter bags become a typed record per producer; this module
/// gives every such record one deterministic serialization: keys sorted,
/// and numeric values that denote the same quantity (`1.0` vs `1`) collapse
/// to the same bit pattern before hashing.
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Bool(bool),
    /// Numbers are always canonicalized to their bit-exact f64 representation,
    /// so `1` and `1.0` and `1.00` all produce the same entry.
    Number(u64),
    Text(String),
}

impl CanonicalValue {
    pub fn from_f64(v: f64) -> Self {
        CanonicalValue::Number(v.to_bits())
    }

    pub fn from_str(v: impl Into<String>) -> Self {
        CanonicalValue::Text(v.into())
    }

    pub fn from_bool(v: bool) -> Self {
        CanonicalValue::Bool(v)
    }
}

/// Sorted key -> value map; `BTreeMap` keeps iteration order deterministic
/// regardless of insertion order, satisfying the "invariant under
/// irrelevant parameter reorderings" requirement on fingerprints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CanonicalParams(BTreeMap<String, CanonicalValue>);

impl CanonicalParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: CanonicalValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: CanonicalValue) {
        self.0.insert(key.into(), value);
    }

    /// Deterministic byte encoding fed into the fingerprint hasher.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.0).expect("CanonicalValue serialization cannot fail")
    }
}

/// A deterministic hash over `(source_cloud_identity, product_kind,
/// canonicalized_parameters, mode, upstream_fingerprints)`. Hex-encoded so
/// it doubles as a filesystem-safe artifact
/// key and a manifest field.
pub fn fingerprint(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        // Length-prefix every part so adjacent fields can never be confused
        // by simple concatenation (e.g. ["ab","c"] vs ["a","bc"]).
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_float_encodings_collapse() {
        let a = CanonicalValue::from_f64(1.0);
        let b = CanonicalValue::from_f64(1.0_f64);
        assert_eq!(a, b);
    }

    #[test]
    fn reordered_keys_produce_identical_bytes() {
        let p1 = CanonicalParams::new()
            .with("resolution", CanonicalValue::from_f64(1.0))
            .with("threshold", CanonicalValue::from_f64(2.0));
        let p2 = CanonicalParams::new()
            .with("threshold", CanonicalValue::from_f64(2.0))
            .with("resolution", CanonicalValue::from_f64(1.0));
        assert_eq!(p1.canonical_bytes(), p2.canonical_bytes());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint(&[b"region", b"dtm", b"{}"]);
        let b = fingerprint(&[b"region", b"dtm", b"{}"]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_any_input() {
        let a = fingerprint(&[b"region", b"dtm", b"{}"]);
        let b = fingerprint(&[b"region", b"dsm", b"{}"]);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_part_boundaries_are_not_confusable() {
        let a = fingerprint(&[b"ab", b"c"]);
        let b = fingerprint(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }
}
