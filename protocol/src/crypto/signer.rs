//! # Signature Schemes
//!
//! The ledger, the issuer and the verifier only ever talk to a
//! [`SignatureScheme`]. None of them know what the keys look like inside,
//! so a post-quantum scheme (ML-DSA, Falcon, ...) can be dropped in later
//! without touching a single call site.
//!
//! ## What ships today
//!
//! [`Ed25519Scheme`], backed by `ed25519-dalek`. It is the classical
//! stand-in: the contract is the same one a lattice scheme would implement.
//! Receipts carry the scheme name (`"ed25519"`), and an offline verifier
//! resolves it through [`scheme_by_name`].
//!
//! ## Contract
//!
//! - `verify` never errors and never panics. Malformed keys, signatures of
//!   the wrong length, garbage of any kind: the answer is simply `false`.
//! - `sign` fails with [`SignerError::InvalidKey`] when the secret key is
//!   not something the scheme can use.
//! - Schemes are stateless apart from key-generation entropy.

use ed25519_dalek::{Signature as DalekSignature, Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keys::{Keypair, PublicKeyBytes, SecretKeyBytes, SignatureBytes};

/// Errors from signing operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("invalid key material for {0}")]
    InvalidKey(&'static str),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Static description of a scheme, served by `GET /algorithms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    pub name: String,
    pub public_key_len: usize,
    pub signature_len: usize,
    /// NIST security category (1, 3 or 5). Ed25519 sits at roughly 1.
    pub security_level: u8,
    pub post_quantum: bool,
}

/// A pluggable signature algorithm.
pub trait SignatureScheme: Send + Sync {
    /// Name carried in wallets and receipts.
    fn name(&self) -> &'static str;

    fn info(&self) -> AlgorithmInfo;

    /// Fresh keypair from the OS RNG.
    fn generate_keypair(&self) -> Keypair;

    fn sign(&self, secret_key: &SecretKeyBytes, message: &[u8])
        -> Result<SignatureBytes, SignerError>;

    fn verify(&self, public_key: &PublicKeyBytes, message: &[u8], signature: &SignatureBytes)
        -> bool;

    /// Whether `public_key` is a well-formed key of this scheme.
    fn is_valid_public_key(&self, public_key: &PublicKeyBytes) -> bool;

    /// Re-derive the public half of a secret key.
    fn public_key_of(&self, secret_key: &SecretKeyBytes) -> Result<PublicKeyBytes, SignerError>;
}

// ---------------------------------------------------------------------------
// Ed25519
// ---------------------------------------------------------------------------

/// Ed25519 (RFC 8032) through `ed25519-dalek`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Scheme;

pub const ED25519: &str = "ed25519";

impl Ed25519Scheme {
    fn signing_key(secret_key: &SecretKeyBytes) -> Result<SigningKey, SignerError> {
        let seed: &[u8; ed25519_dalek::SECRET_KEY_LENGTH] = secret_key
            .as_bytes()
            .try_into()
            .map_err(|_| SignerError::InvalidKey(ED25519))?;
        Ok(SigningKey::from_bytes(seed))
    }

    fn verifying_key(public_key: &PublicKeyBytes) -> Option<VerifyingKey> {
        let bytes: &[u8; ed25519_dalek::PUBLIC_KEY_LENGTH] =
            public_key.as_bytes().try_into().ok()?;
        VerifyingKey::from_bytes(bytes).ok()
    }
}

impl SignatureScheme for Ed25519Scheme {
    fn name(&self) -> &'static str {
        ED25519
    }

    fn info(&self) -> AlgorithmInfo {
        AlgorithmInfo {
            name: ED25519.to_string(),
            public_key_len: ed25519_dalek::PUBLIC_KEY_LENGTH,
            signature_len: ed25519_dalek::SIGNATURE_LENGTH,
            security_level: 1,
            post_quantum: false,
        }
    }

    fn generate_keypair(&self) -> Keypair {
        let signing_key = SigningKey::generate(&mut OsRng);
        Keypair {
            public_key: PublicKeyBytes::new(signing_key.verifying_key().to_bytes()),
            secret_key: SecretKeyBytes::new(signing_key.to_bytes()),
        }
    }

    fn sign(
        &self,
        secret_key: &SecretKeyBytes,
        message: &[u8],
    ) -> Result<SignatureBytes, SignerError> {
        let signing_key = Self::signing_key(secret_key)?;
        Ok(SignatureBytes::new(signing_key.sign(message).to_bytes()))
    }

    fn verify(
        &self,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> bool {
        let Some(verifying_key) = Self::verifying_key(public_key) else {
            return false;
        };
        let Ok(sig) = DalekSignature::from_slice(signature.as_bytes()) else {
            return false;
        };
        verifying_key.verify_strict(message, &sig).is_ok()
    }

    fn is_valid_public_key(&self, public_key: &PublicKeyBytes) -> bool {
        Self::verifying_key(public_key).is_some()
    }

    fn public_key_of(&self, secret_key: &SecretKeyBytes) -> Result<PublicKeyBytes, SignerError> {
        let signing_key = Self::signing_key(secret_key)?;
        Ok(PublicKeyBytes::new(signing_key.verifying_key().to_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

static ED25519_SCHEME: Ed25519Scheme = Ed25519Scheme;

static SCHEMES: &[&dyn SignatureScheme] = &[&ED25519_SCHEME];

/// The scheme used for new wallets and for the sealer key when nothing else
/// is asked for.
pub fn default_scheme() -> &'static dyn SignatureScheme {
    &ED25519_SCHEME
}

/// Resolve a scheme by its receipt name (case-insensitive).
pub fn scheme_by_name(name: &str) -> Result<&'static dyn SignatureScheme, SignerError> {
    SCHEMES
        .iter()
        .copied()
        .find(|s| s.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| SignerError::UnsupportedAlgorithm(name.to_string()))
}

/// Every registered scheme, in registration order.
pub fn supported_algorithms() -> Vec<AlgorithmInfo> {
    SCHEMES.iter().map(|s| s.info()).collect()
}
