//! Wallet registry entries.
//!
//! A wallet binds an id to exactly one public key for its whole life. The
//! only mutable field is `next_nonce`, and only the ledger moves it: once
//! per accepted submission, by exactly one.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::config::MAX_USER_ID_LENGTH;
use crate::crypto::keys::PublicKeyBytes;
use crate::crypto::signer::scheme_by_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: String,
    /// Optional label of the owning user, opaque to the ledger.
    pub user_id: Option<String>,
    pub public_key: PublicKeyBytes,
    /// Signature scheme the key belongs to.
    pub algorithm: String,
    /// Nonce the next prepared transaction will carry. Starts at 0.
    pub next_nonce: u64,
    /// Unix seconds.
    pub created_at: u64,
}

impl Wallet {
    /// Register a new wallet after checking that `public_key` really is a
    /// key of `algorithm`. The algorithm name is normalized to the scheme's
    /// canonical spelling.
    pub fn new(
        wallet_id: String,
        public_key: PublicKeyBytes,
        algorithm: &str,
        user_id: Option<String>,
        created_at: u64,
    ) -> Result<Self, ValidationError> {
        let scheme = scheme_by_name(algorithm)
            .map_err(|_| ValidationError::UnsupportedAlgorithm(algorithm.to_string()))?;
        if !scheme.is_valid_public_key(&public_key) {
            return Err(ValidationError::InvalidPublicKey(scheme.name().to_string()));
        }
        if user_id
            .as_ref()
            .is_some_and(|u| u.chars().count() > MAX_USER_ID_LENGTH)
        {
            return Err(ValidationError::InvalidUserId);
        }

        Ok(Self {
            wallet_id,
            user_id,
            public_key,
            algorithm: scheme.name().to_string(),
            next_nonce: 0,
            created_at,
        })
    }

    /// Copy with the nonce advanced by one.
    pub fn advanced(&self) -> Self {
        Self {
            next_nonce: self.next_nonce + 1,
            ..self.clone()
        }
    }
}
