//! psur_common
//!
//! Canonical JSON serialization + SHA-256 hashing utilities.
//! This exists to guarantee determinism for:
//! - audit event hashing
//! - evidence atom provenance hashes
//! - compiled IR comparisons
//!
//! IMPORTANT: Do not "pretty print". Hashes must be computed over canonical bytes.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize to canonical JSON bytes:
/// - stable key ordering (we enforce sorting via Value roundtrip)
/// - no whitespace
/// - UTF-8
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let v = serde_json::to_value(value)?;
    let sorted = sort_json_value(v);
    Ok(serde_json::to_vec(&sorted)?)
}

/// Return "sha256:<hex>" of canonical JSON bytes.
pub fn sha256_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(sha256_bytes(&bytes))
}

/// Return "sha256:<hex>" of raw bytes.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}

/// Return the bare lowercase hex SHA-256 digest of raw bytes, with no prefix.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Return the first `len` hex characters of the bare SHA-256 digest of canonical JSON.
/// Used for `EvidenceAtom::provenance_hash`, which is truncated per the external contract.
pub fn sha256_canonical_json_truncated<T: Serialize>(
    value: &T,
    len: usize,
) -> Result<String, CanonError> {
    let bytes = canonical_json_bytes(value)?;
    let full = sha256_hex(&bytes);
    Ok(full.chars().take(len).collect())
}

fn sort_json_value(v: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in entries {
                out.insert(k, sort_json_value(v));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Obj {
        b: u32,
        a: u32,
    }

    #[test]
    fn canonical_hash_is_stable() {
        let x = Obj { b: 2, a: 1 };
        let y = Obj { a: 1, b: 2 };
        let hx = sha256_canonical_json(&x).unwrap();
        let hy = sha256_canonical_json(&y).unwrap();
        assert_eq!(hx, hy);
    }

    #[test]
    fn sha256_bytes_is_prefixed_and_sha256_hex_is_bare() {
        let prefixed = sha256_bytes(b"hello");
        let bare = sha256_hex(b"hello");
        assert_eq!(prefixed, format!("sha256:{bare}"));
        assert_eq!(bare.len(), 64);
        assert!(bare.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn truncated_hash_is_a_prefix_of_the_full_hex_digest() {
        let x = Obj { b: 2, a: 1 };
        let full = sha256_canonical_json(&x).unwrap();
        let full_hex = full.strip_prefix("sha256:").unwrap();
        let truncated = sha256_canonical_json_truncated(&x, 16).unwrap();
        assert_eq!(truncated, &full_hex[..16]);
    }
}