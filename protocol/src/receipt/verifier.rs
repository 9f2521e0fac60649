//! # Offline Verifier
//!
//! Checks a receipt using only the receipt. No ledger, no database, no
//! network: this module depends on hashing, the Merkle replay and the
//! signature schemes, and on nothing that holds state.
//!
//! ## Steps
//!
//! 1. Recompute the leaf: SHA-256 of the canonical payload in `tx`.
//! 2. Fold the leaf through `merkle_proof`.
//! 3. Compare with `block_header.merkle_root`; a difference is
//!    [`FailureReason::ProofMismatch`].
//! 4. Verify `signature` over the canonical payload with `public_key`; a
//!    failure is [`FailureReason::SignatureInvalid`].
//!
//! [`verify_with_sealer`] adds a fifth step for callers that pin the
//! sealing service's key: the header signature must verify and the header
//! key must be the trusted one.
//!
//! A proof mismatch means the payload is not in that block. A bad
//! signature means the sender never authorized that payload. The two are
//! always reported separately.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Receipt;
use crate::crypto::keys::PublicKeyBytes;
use crate::crypto::signer::{default_scheme, scheme_by_name};
use crate::merkle::replay;

/// Why a receipt did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Not parseable as a receipt (bad JSON, bad hex, missing fields).
    MalformedReceipt,
    /// `algorithm` names no known scheme.
    UnsupportedAlgorithm,
    /// The proof does not lead from the payload to the header's root.
    ProofMismatch,
    /// The sender's signature does not verify.
    SignatureInvalid,
    /// The sealer's header signature does not verify.
    HeaderSignatureInvalid,
    /// The header was signed by a key other than the trusted sealer.
    UntrustedSealer,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MalformedReceipt => "malformed_receipt",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::ProofMismatch => "proof_mismatch",
            Self::SignatureInvalid => "signature_invalid",
            Self::HeaderSignatureInvalid => "header_signature_invalid",
            Self::UntrustedSealer => "untrusted_sealer",
        };
        f.write_str(s)
    }
}

/// Verdict of a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl Verification {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn fail(reason: FailureReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

/// Verify payload inclusion and the sender's signature.
pub fn verify(receipt: &Receipt) -> Verification {
    let leaf = receipt.tx.hash();
    let candidate_root = replay(&leaf, &receipt.merkle_proof);
    if candidate_root != receipt.block_header.merkle_root {
        return Verification::fail(FailureReason::ProofMismatch);
    }

    let Ok(scheme) = scheme_by_name(&receipt.algorithm) else {
        return Verification::fail(FailureReason::UnsupportedAlgorithm);
    };
    let message = receipt.tx.canonical_bytes();
    if !scheme.verify(&receipt.public_key, &message, &receipt.signature) {
        return Verification::fail(FailureReason::SignatureInvalid);
    }

    Verification::ok()
}

/// Parse the wire form and verify it. Unparseable input is a verdict, not
/// an error.
pub fn verify_json(json: &str) -> Verification {
    match Receipt::from_json(json) {
        Ok(receipt) => verify(&receipt),
        Err(_) => Verification::fail(FailureReason::MalformedReceipt),
    }
}

/// [`verify`], plus the block header must be signed by `trusted_sealer`.
pub fn verify_with_sealer(receipt: &Receipt, trusted_sealer: &PublicKeyBytes) -> Verification {
    let verdict = verify(receipt);
    if !verdict.valid {
        return verdict;
    }
    if &receipt.block_header.sealer_public_key != trusted_sealer {
        return Verification::fail(FailureReason::UntrustedSealer);
    }
    if !receipt.block_header.verify_signature(default_scheme()) {
        return Verification::fail(FailureReason::HeaderSignatureInvalid);
    }
    Verification::ok()
}
