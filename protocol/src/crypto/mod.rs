//! # Cryptographic Primitives for QReceipt
//!
//! Everything a receipt's validity rests on flows through here:
//!
//! - **SHA-256** for Merkle leaves and nodes, because third-party verifiers
//!   must be able to recompute them with whatever their platform ships.
//! - **BLAKE3** for internal identifiers.
//! - A pluggable [`SignatureScheme`] for payload and block-header signatures,
//!   with Ed25519 as the shipped implementation.
//!
//! We don't roll our own anything. These are thin, typed wrappers around
//! audited crates.

pub mod hash;
pub mod keys;
pub mod signer;

pub use hash::{digest_from_hex, domain_separated_hash, hash_pair, sha256, to_hex, Digest};
pub use keys::{KeyError, Keypair, PublicKeyBytes, SecretKeyBytes, SignatureBytes};
pub use signer::{
    default_scheme, scheme_by_name, supported_algorithms, AlgorithmInfo, Ed25519Scheme,
    SignatureScheme, SignerError,
};
