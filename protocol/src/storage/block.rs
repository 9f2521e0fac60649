//! # Block Structure
//!
//! A block is one sealed batch of transactions: the Merkle root over their
//! payload hashes, the order they were hashed in, and the sealer's
//! signature over the header.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  BlockHeader                                 │
//! │  ├── index: u64             (0, 1, 2, ...)   │
//! │  ├── sealed_at: u64         (Unix seconds)   │
//! │  ├── merkle_root: [u8; 32]  (SHA-256 tree)   │
//! │  ├── sealer_public_key                       │
//! │  └── sealer_signature                        │
//! ├──────────────────────────────────────────────┤
//! │  transaction_ids: Vec<TxId> (leaf order)     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Only the header travels inside a receipt. The id list stays in the
//! ledger, where it is enough to rebuild the root from stored records.
//!
//! ## Header Signature
//!
//! The sealer signs the canonical string
//! `qreceipt/block/v1|{index}|{sealed_at}|{merkle_root_hex}`. The public key
//! sits in the header for convenience only; a verifier that cares about
//! *who* sealed a block pins the key it trusts and compares.

use serde::{Deserialize, Serialize};

use crate::config::{CANONICAL_BLOCK_PREFIX, CANONICAL_SEPARATOR};
use crate::crypto::hash::{hex_digest, to_hex, Digest};
use crate::crypto::keys::{PublicKeyBytes, SecretKeyBytes, SignatureBytes};
use crate::crypto::signer::{SignatureScheme, SignerError};
use crate::transaction::TxId;

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

/// The part of a block that is copied into every receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    /// Unix seconds.
    pub sealed_at: u64,
    #[serde(with = "hex_digest")]
    pub merkle_root: Digest,
    pub sealer_public_key: PublicKeyBytes,
    pub sealer_signature: SignatureBytes,
}

/// Canonical bytes the sealer signs.
pub fn header_signing_bytes(index: u64, sealed_at: u64, merkle_root: &Digest) -> Vec<u8> {
    let sep = CANONICAL_SEPARATOR;
    format!(
        "{CANONICAL_BLOCK_PREFIX}{sep}{index}{sep}{sealed_at}{sep}{}",
        to_hex(merkle_root)
    )
    .into_bytes()
}

impl BlockHeader {
    /// Build and sign a header.
    pub fn signed(
        index: u64,
        sealed_at: u64,
        merkle_root: Digest,
        scheme: &dyn SignatureScheme,
        sealer_secret: &SecretKeyBytes,
        sealer_public_key: PublicKeyBytes,
    ) -> Result<Self, SignerError> {
        let message = header_signing_bytes(index, sealed_at, &merkle_root);
        let sealer_signature = scheme.sign(sealer_secret, &message)?;
        Ok(Self {
            index,
            sealed_at,
            merkle_root,
            sealer_public_key,
            sealer_signature,
        })
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        header_signing_bytes(self.index, self.sealed_at, &self.merkle_root)
    }

    /// Check the sealer signature against the key embedded in the header.
    pub fn verify_signature(&self, scheme: &dyn SignatureScheme) -> bool {
        scheme.verify(
            &self.sealer_public_key,
            &self.signing_bytes(),
            &self.sealer_signature,
        )
    }

    pub fn merkle_root_hex(&self) -> String {
        to_hex(&self.merkle_root)
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A sealed block. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Transaction ids in Merkle leaf order.
    pub transaction_ids: Vec<TxId>,
}

impl Block {
    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn tx_count(&self) -> usize {
        self.transaction_ids.len()
    }

    /// Position of `tx_id` among the leaves, if present.
    pub fn position_of(&self, tx_id: &str) -> Option<usize> {
        self.transaction_ids.iter().position(|id| id == tx_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
