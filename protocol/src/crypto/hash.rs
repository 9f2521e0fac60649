//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **SHA-256** hashes Merkle leaves and internal nodes, and produces the
//!   `payload_hash` the client sees. Anything an external verifier has to
//!   recompute goes through SHA-256 so that a browser with nothing but
//!   WebCrypto can check a receipt.
//!
//! - **BLAKE3** derives internal identifiers (transaction IDs). Nobody
//!   outside the ledger recomputes those, so we use the faster hash with
//!   proper domain separation.
//!
//! Every digest is a plain `[u8; 32]`. Hex conversion lives here too, so the
//! rest of the crate never hand-rolls `hex::decode` + length checks.

use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::config::HASH_OUTPUT_LENGTH;

/// A 32-byte digest.
pub type Digest = [u8; HASH_OUTPUT_LENGTH];

/// Errors from parsing hex-encoded digests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("digest must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use qreceipt_protocol::crypto::sha256;
///
/// let hash = sha256(b"");
/// assert_eq!(
///     hex::encode(hash),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash two child digests into their parent: `SHA-256(left || right)`.
///
/// The children are fed as raw 32-byte values, not hex strings. This is the
/// only node-combining rule in the tree and the verifier uses the very same
/// function, so the two can't drift apart.
pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Compute a domain-separated BLAKE3 hash using `derive_key` mode.
///
/// Different contexts never collide, even over identical data.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Lowercase hex encoding of a digest.
pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Parse a hex digest (either case) into its 32 raw bytes.
pub fn digest_from_hex(s: &str) -> Result<Digest, HashError> {
    let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| HashError::InvalidLength {
            expected: HASH_OUTPUT_LENGTH,
            actual: bytes.len(),
        })
}

/// Serde adapter: a [`Digest`] as a hex string.
///
/// Use with `#[serde(with = "crate::crypto::hash::hex_digest")]`.
pub mod hex_digest {
    use super::{digest_from_hex, to_hex, Digest};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let s = String::deserialize(deserializer)?;
        digest_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"abc");
        assert_eq!(
            to_hex(&hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha256_deterministic() {
        assert_eq!(sha256(b"qreceipt"), sha256(b"qreceipt"));
        assert_ne!(sha256(b"qreceipt"), sha256(b"QReceipt"));
    }

    #[test]
    fn test_hash_pair_is_concatenation() {
        let left = sha256(b"left");
        let right = sha256(b"right");

        let mut concat = Vec::with_capacity(64);
        concat.extend_from_slice(&left);
        concat.extend_from_slice(&right);

        assert_eq!(hash_pair(&left, &right), sha256(&concat));
    }

    #[test]
    fn test_hash_pair_order_matters() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));
    }

    #[test]
    fn test_domain_separation() {
        let data = b"same data";
        assert_ne!(
            domain_separated_hash("context-a", data),
            domain_separated_hash("context-b", data)
        );
        assert_ne!(
            domain_separated_hash("context-a", data),
            *blake3::hash(data).as_bytes()
        );
    }

    #[test]
    fn test_hex_roundtrip_accepts_uppercase() {
        let digest = sha256(b"hex");
        let upper = to_hex(&digest).to_uppercase();
        assert_eq!(digest_from_hex(&upper).unwrap(), digest);
    }

    #[test]
    fn test_digest_from_hex_rejects_bad_input() {
        assert!(matches!(
            digest_from_hex("zz"),
            Err(HashError::InvalidHex(_))
        ));
        assert_eq!(
            digest_from_hex("abcd"),
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }
}
