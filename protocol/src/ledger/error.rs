//! Ledger error types.
//!
//! Three families, with different consequences for the caller:
//!
//! - [`ValidationError`]: the request was rejected and nothing changed.
//!   The transaction never entered the pool.
//! - `NotFound` / `NotConfirmed`: lookups. `NotConfirmed` is transient;
//!   retry once the next block seals.
//! - `Internal` / `Storage`: something broke on our side. A failed seal has
//!   already been rolled back when one of these comes out.

use thiserror::Error;

use crate::crypto::signer::SignerError;
use crate::merkle::MerkleError;
use crate::storage::db::DbError;
use crate::transaction::PayloadError;

/// Why a wallet registration, prepare or submit was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("nonce mismatch for wallet {wallet_id}: expected {expected}, got {got}")]
    NonceMismatch {
        wallet_id: String,
        expected: u64,
        got: u64,
    },

    #[error("signature does not verify against the wallet key")]
    SignatureInvalid,

    #[error("public key does not match the key registered for wallet {0}")]
    UnknownPublicKey(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("payload hash does not match the canonical payload")]
    PayloadHashMismatch,

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("public key is not a valid {0} key")]
    InvalidPublicKey(String),

    #[error("invalid user id: at most 128 characters")]
    InvalidUserId,
}

impl ValidationError {
    /// Stable snake_case tag, used by the API error body and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownWallet(_) => "unknown_wallet",
            Self::NonceMismatch { .. } => "nonce_mismatch",
            Self::SignatureInvalid => "signature_invalid",
            Self::UnknownPublicKey(_) => "unknown_public_key",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::PayloadHashMismatch => "payload_hash_mismatch",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidPublicKey(_) => "invalid_public_key",
            Self::InvalidUserId => "invalid_user_id",
        }
    }
}

/// Top-level ledger error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transaction {0} is not confirmed yet")]
    NotConfirmed(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl LedgerError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(v) => v.kind(),
            Self::NotFound(_) => "not_found",
            Self::NotConfirmed(_) => "not_confirmed",
            Self::Internal(_) => "internal",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<MerkleError> for LedgerError {
    fn from(e: MerkleError) -> Self {
        Self::Internal(format!("merkle: {e}"))
    }
}

impl From<SignerError> for LedgerError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::UnsupportedAlgorithm(name) => {
                Self::Validation(ValidationError::UnsupportedAlgorithm(name))
            }
            SignerError::InvalidKey(scheme) => Self::Internal(format!("sealer key rejected by {scheme}")),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_snake_case() {
        let errors = [
            LedgerError::from(ValidationError::UnknownWallet("w".into())),
            LedgerError::from(ValidationError::NonceMismatch {
                wallet_id: "w".into(),
                expected: 1,
                got: 0,
            }),
            LedgerError::from(ValidationError::InvalidPayload(PayloadError::ZeroAmount)),
            LedgerError::NotFound("tx".into()),
            LedgerError::NotConfirmed("tx".into()),
            LedgerError::Internal("boom".into()),
        ];
        for e in &errors {
            let kind = e.kind();
            assert!(kind.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{kind}");
        }
    }

    #[test]
    fn test_validation_message_is_transparent() {
        let e = LedgerError::from(ValidationError::SignatureInvalid);
        assert_eq!(e.to_string(), "signature does not verify against the wallet key");
    }

    #[test]
    fn test_signer_error_mapping() {
        let e = LedgerError::from(SignerError::UnsupportedAlgorithm("falcon".into()));
        assert_eq!(e.kind(), "unsupported_algorithm");
        let e = LedgerError::from(SignerError::InvalidKey("ed25519"));
        assert_eq!(e.kind(), "internal");
    }
}
