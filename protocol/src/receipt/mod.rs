//! # Receipts
//!
//! A receipt is the self-contained proof that a transfer happened and was
//! sealed into a block. Everything needed to check it is inside:
//!
//! ```json
//! {
//!   "tx":           { "from_wallet", "to_wallet", "amount", "currency", "nonce", "timestamp" },
//!   "algorithm":    "ed25519",
//!   "signature":    "<hex>",
//!   "public_key":   "<hex>",
//!   "block_header": { "index", "sealed_at", "merkle_root", "sealer_public_key", "sealer_signature" },
//!   "merkle_proof": [ { "direction": "left" | "right", "sibling_hash": "<hex>" } ]
//! }
//! ```
//!
//! This JSON shape is a public contract: other implementations verify it
//! byte for byte, so field names never change without a version bump of
//! the canonical prefixes in [`crate::config`].
//!
//! - [`issuer`] assembles receipts from stored ledger data.
//! - [`verifier`] checks them with nothing but the receipt itself.

pub mod issuer;
pub mod verifier;

pub use issuer::issue_receipt;
pub use verifier::{verify, verify_json, verify_with_sealer, FailureReason, Verification};

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{PublicKeyBytes, SignatureBytes};
use crate::merkle::MerkleProof;
use crate::storage::block::BlockHeader;
use crate::transaction::TransactionPayload;

/// Offline-verifiable proof of settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx: TransactionPayload,
    pub algorithm: String,
    pub signature: SignatureBytes,
    pub public_key: PublicKeyBytes,
    pub block_header: BlockHeader,
    pub merkle_proof: MerkleProof,
}

impl Receipt {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Hex tx id, recomputed from the payload.
    pub fn tx_id(&self) -> String {
        self.tx.tx_id()
    }
}
