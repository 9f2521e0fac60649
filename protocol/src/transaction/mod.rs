//! # Transaction Module
//!
//! Payload types, canonical encoding and structural validation for
//! QReceipt transfers.
//!
//! ## Architecture
//!
//! ```text
//! types.rs:      TransactionPayload, PreparedTransaction, SubmittedTransaction,
//!                TransactionStatus, TransactionRecord
//! canonical.rs:  the signed/hashed byte string, payload hash, tx id
//! validation.rs: field rules (wallet ids, currency, amount, self-transfer)
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Prepare**. The ledger fills in the sender's next nonce and a
//!    timestamp, and returns a [`PreparedTransaction`].
//! 2. **Sign**. The client signs [`PreparedTransaction::signing_bytes`].
//! 3. **Submit**. The ledger checks hash, key, signature and nonce, then
//!    stores a Pending [`TransactionRecord`].
//! 4. **Seal**. The sealer confirms the record and attaches its proof.
//!
//! ## Design Decisions
//!
//! - Amounts are `u64` in the currency's minor unit.
//! - The payload hash is SHA-256 so that any platform can recompute it;
//!   the tx id is a BLAKE3 derive-key hash since only the ledger makes them.

pub mod canonical;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_string, payload_hash, tx_id};
pub use types::{
    PreparedTransaction, SubmittedTransaction, TransactionPayload, TransactionRecord,
    TransactionStatus, TxId,
};
pub use validation::{is_valid_currency, is_valid_wallet_id, validate_payload, PayloadError};
