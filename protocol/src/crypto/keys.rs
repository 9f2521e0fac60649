//! # Key & Signature Bytes
//!
//! Algorithm-agnostic containers for public keys, secret keys and
//! signatures.
//!
//! The ledger never looks inside these. A post-quantum scheme has 1–3 KB
//! keys and signatures where Ed25519 has 32 and 64 bytes, so the containers
//! are plain byte vectors and the owning [`SignatureScheme`] decides whether
//! the contents make sense.
//!
//! On the wire (JSON) every one of them is a hex string. Decoding accepts
//! either case, encoding always produces lowercase.
//!
//! ## Secret keys
//!
//! `SecretKeyBytes` has a redacted `Debug` and no `Serialize` impl. Handing a
//! secret key to a serializer should be a deliberate act: use
//! [`SecretKeyBytes::to_hex`] explicitly.
//!
//! [`SignatureScheme`]: super::signer::SignatureScheme

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors from decoding hex key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("key material is empty")]
    Empty,
}

fn decode_hex(s: &str) -> Result<Vec<u8>, KeyError> {
    let bytes = hex::decode(s.trim()).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
    if bytes.is_empty() {
        return Err(KeyError::Empty);
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Public newtypes
// ---------------------------------------------------------------------------

macro_rules! hex_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap raw bytes.
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            /// Decode from hex (either case). Empty input is rejected.
            pub fn from_hex(s: &str) -> Result<Self, KeyError> {
                decode_hex(s).map(Self)
            }

            /// Lowercase hex encoding.
            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes!(
    /// Encoded public key of some signature scheme.
    PublicKeyBytes
);

hex_bytes!(
    /// Encoded signature of some signature scheme.
    SignatureBytes
);

// ---------------------------------------------------------------------------
// Secret keys
// ---------------------------------------------------------------------------

/// Encoded secret key. Never printed, never implicitly serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKeyBytes(Vec<u8>);

impl SecretKeyBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        decode_hex(s).map(Self)
    }

    /// Hex export. Handle with care: this is the whole secret.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKeyBytes([REDACTED; {}])", self.0.len())
    }
}

/// A freshly generated keypair.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub public_key: PublicKeyBytes,
    pub secret_key: SecretKeyBytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let pk = PublicKeyBytes::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(pk.to_hex(), "deadbeef");
        assert_eq!(PublicKeyBytes::from_hex("DEADBEEF").unwrap(), pk);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(matches!(
            SignatureBytes::from_hex("not hex"),
            Err(KeyError::InvalidHex(_))
        ));
        assert_eq!(SignatureBytes::from_hex(""), Err(KeyError::Empty));
    }

    #[test]
    fn test_json_is_hex_string() {
        let sig = SignatureBytes::new(vec![1, 2, 3]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "\"010203\"");

        let back: SignatureBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }

    #[test]
    fn test_json_rejects_invalid_hex() {
        let result: Result<PublicKeyBytes, _> = serde_json::from_str("\"xyz\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_bincode_roundtrip() {
        let pk = PublicKeyBytes::new(vec![7u8; 32]);
        let encoded = bincode::serialize(&pk).unwrap();
        let decoded: PublicKeyBytes = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, pk);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let sk = SecretKeyBytes::new(vec![0xaa; 32]);
        let debug = format!("{:?}", sk);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("aaaa"));
    }
}
