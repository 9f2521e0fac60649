// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # QReceipt Protocol Core Library
//!
//! Proof-of-settlement receipts for peer-to-peer transfers that anyone can
//! verify offline, long after the fact, without asking the service that
//! issued them.
//!
//! A sender signs a canonical payload. The ledger checks the signature and
//! the sender's nonce, queues the transfer, and periodically seals the queue
//! into a block: a SHA-256 Merkle tree over the batch plus a header signed
//! by the sealing service. Each transfer then gets a receipt carrying its
//! payload, signature, the block header and its Merkle path. The receipt is
//! the whole proof.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants, domain tags and [`LedgerConfig`].
//! - **crypto**: Hashing, key containers, pluggable signature schemes.
//! - **merkle**: Tree builder, inclusion proofs, proof replay.
//! - **transaction**: Payload types, canonical encoding, field rules.
//! - **storage**: Blocks, the `KvStore` engines and typed persistence.
//! - **ledger**: Wallets, nonces, the pending pool and the sealer.
//! - **receipt**: Receipt assembly and the offline verifier.
//!
//! ## Quick tour
//!
//! ```
//! use qreceipt_protocol::config::LedgerConfig;
//! use qreceipt_protocol::crypto::{Ed25519Scheme, SignatureScheme};
//! use qreceipt_protocol::ledger::Ledger;
//! use qreceipt_protocol::receipt::verify;
//! use qreceipt_protocol::transaction::SubmittedTransaction;
//!
//! let ledger = Ledger::in_memory(LedgerConfig::default());
//! let keys = Ed25519Scheme.generate_keypair();
//! let alice = ledger.create_wallet(keys.public_key.clone(), "ed25519", None).unwrap();
//!
//! let prepared = ledger.prepare(&alice.wallet_id, "bob", 10_000, "USD").unwrap();
//! let signature = Ed25519Scheme.sign(&keys.secret_key, &prepared.signing_bytes()).unwrap();
//! let tx_id = ledger
//!     .submit(SubmittedTransaction { prepared, signature, public_key: keys.public_key })
//!     .unwrap()
//!     .tx_id;
//!
//! ledger.seal().unwrap();
//! let receipt = ledger.get_receipt(&tx_id).unwrap();
//! assert!(verify(&receipt).valid);
//! ```
//!
//! ## Design Philosophy
//!
//! 1. The receipt is the contract. Anything that goes into a hash or a
//!    signature has one documented byte layout.
//! 2. The verifier depends on nothing that holds state.
//! 3. A seal either fully happens or leaves no trace.
//! 4. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod merkle;
pub mod receipt;
pub mod storage;
pub mod transaction;

pub use config::LedgerConfig;
