//! Core type definitions for QReceipt transactions.
//!
//! A transfer moves through three shapes before it becomes a stored
//! record:
//!
//! ```text
//! TransactionPayload ──prepare──▶ PreparedTransaction ──client signs──▶ SubmittedTransaction
//!                                                                            │
//!                                                            ledger accepts  ▼
//!                                                                    TransactionRecord
//! ```
//!
//! Everything here is immutable once built. The only field that ever
//! changes on a record is its status, and only once (Pending → Confirmed).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::canonical;
use crate::crypto::hash::{hex_digest, Digest};
use crate::crypto::keys::{PublicKeyBytes, SignatureBytes};
use crate::merkle::MerkleProof;

/// Hex-encoded transaction identifier.
pub type TxId = String;

// ---------------------------------------------------------------------------
// TransactionPayload
// ---------------------------------------------------------------------------

/// The transfer itself: who pays whom, how much, and at which nonce.
///
/// `amount` is an integer in the currency's minor unit (cents, centavos).
/// There is no floating point anywhere near money.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub from_wallet: String,
    pub to_wallet: String,
    pub amount: u64,
    pub currency: String,
    pub nonce: u64,
    /// Unix seconds, set by the ledger at preparation.
    pub timestamp: u64,
}

impl TransactionPayload {
    /// The exact bytes that get signed and hashed.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical::canonical_bytes(self)
    }

    /// SHA-256 of the canonical bytes; also the Merkle leaf.
    pub fn hash(&self) -> Digest {
        canonical::payload_hash(self)
    }

    pub fn tx_id(&self) -> TxId {
        canonical::tx_id(self)
    }
}

// ---------------------------------------------------------------------------
// PreparedTransaction
// ---------------------------------------------------------------------------

/// A payload with its nonce reserved, ready for the client to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    pub payload: TransactionPayload,
    #[serde(with = "hex_digest")]
    pub payload_hash: Digest,
}

impl PreparedTransaction {
    pub fn new(payload: TransactionPayload) -> Self {
        let payload_hash = payload.hash();
        Self {
            payload,
            payload_hash,
        }
    }

    /// What the client must sign: the canonical payload bytes.
    pub fn signing_bytes(&self) -> Vec<u8> {
        self.payload.canonical_bytes()
    }
}

// ---------------------------------------------------------------------------
// SubmittedTransaction
// ---------------------------------------------------------------------------

/// A prepared transaction plus the sender's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    #[serde(flatten)]
    pub prepared: PreparedTransaction,
    pub signature: SignatureBytes,
    pub public_key: PublicKeyBytes,
}

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state. `Confirmed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Accepted into the pending pool, not yet sealed.
    Pending,
    /// Sealed into a block; proof available.
    Confirmed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// The ledger's stored form of an accepted submission.
///
/// `block_index` and `merkle_proof` are filled in exactly once, by the
/// sealer, when the status moves to `Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_id: TxId,
    /// Global submission order; defines leaf order across restarts.
    pub sequence: u64,
    pub payload: TransactionPayload,
    #[serde(with = "hex_digest")]
    pub payload_hash: Digest,
    pub signature: SignatureBytes,
    pub public_key: PublicKeyBytes,
    pub algorithm: String,
    pub status: TransactionStatus,
    pub block_index: Option<u64>,
    pub merkle_proof: Option<MerkleProof>,
    /// Unix seconds.
    pub submitted_at: u64,
}

impl TransactionRecord {
    pub fn is_confirmed(&self) -> bool {
        self.status == TransactionStatus::Confirmed
    }

    /// Move to `Confirmed` with the block position. Returns the updated copy.
    pub fn confirmed(&self, block_index: u64, proof: MerkleProof) -> Self {
        Self {
            status: TransactionStatus::Confirmed,
            block_index: Some(block_index),
            merkle_proof: Some(proof),
            ..self.clone()
        }
    }
}
