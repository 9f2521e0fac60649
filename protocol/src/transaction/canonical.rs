//! Canonical payload encoding.
//!
//! The bytes a sender signs and the bytes the sealer hashes into the Merkle
//! tree are the same bytes, produced here and nowhere else:
//!
//! ```text
//! qreceipt/tx/v1|{from_wallet}|{to_wallet}|{amount}|{currency}|{nonce}|{timestamp}
//! ```
//!
//! Integers are plain base-10. None of the validated field alphabets
//! contain `|`, so the encoding cannot be ambiguous. A serde encoder is
//! never used for this: its field order is an implementation detail, this
//! string is a contract.

use crate::config::{CANONICAL_SEPARATOR, CANONICAL_TX_PREFIX, TX_ID_CONTEXT};
use crate::crypto::hash::{domain_separated_hash, sha256, Digest};

use super::types::{TransactionPayload, TxId};

/// Canonical payload as a string.
pub fn canonical_string(payload: &TransactionPayload) -> String {
    let sep = CANONICAL_SEPARATOR;
    format!(
        "{CANONICAL_TX_PREFIX}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
        payload.from_wallet,
        payload.to_wallet,
        payload.amount,
        payload.currency,
        payload.nonce,
        payload.timestamp,
    )
}

pub fn canonical_bytes(payload: &TransactionPayload) -> Vec<u8> {
    canonical_string(payload).into_bytes()
}

/// SHA-256 of the canonical bytes. Used as `payload_hash` and as the leaf.
pub fn payload_hash(payload: &TransactionPayload) -> Digest {
    sha256(&canonical_bytes(payload))
}

/// BLAKE3 derive-key hash of the canonical bytes, hex-encoded.
pub fn tx_id(payload: &TransactionPayload) -> TxId {
    hex::encode(domain_separated_hash(TX_ID_CONTEXT, &canonical_bytes(payload)))
}
