//! Deterministic hashing of canonical artifacts.
//!
//! - Canonical JSON hashing: sorted object keys, array order preserved.
//! - Hex digests are lowercase.
//! - `snapshot_id` derives the `SNAP:<hex>` identifier of an end-result snapshot.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::IoResult;

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over the canonical JSON bytes of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

/// `SNAP:<hex>` identifier of a snapshot, derived from canonical bytes.
pub fn snapshot_id<T: Serialize>(value: &T) -> IoResult<String> {
    Ok(format!("SNAP:{}", sha256_canonical(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn key_order_does_not_change_digest() {
        let a = json!({"a": 1, "b": [1, 2]});
        let b = json!({"b": [1, 2], "a": 1});
        assert_eq!(sha256_canonical(&a).unwrap(), sha256_canonical(&b).unwrap());
        assert_ne!(sha256_canonical(&a).unwrap(), sha256_canonical(&json!({"a": 1, "b": [2, 1]})).unwrap());
        assert!(snapshot_id(&a).unwrap().starts_with("SNAP:"));
    }
}
