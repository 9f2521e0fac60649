//! # Storage Module
//!
//! Sealed blocks and the persistence layer underneath the ledger.
//!
//! ## Architecture
//!
//! ```text
//! block.rs:  Block / BlockHeader, canonical header bytes, sealer signature
//! kv.rs:     KvStore trait + sled and in-memory engines
//! db.rs:     LedgerDb: typed wallets, records, blocks, tip over any KvStore
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! submit ──▶ LedgerDb::commit_submission ──▶ KvStore::put_batch
//! seal   ──▶ LedgerDb::commit_seal       ──▶ KvStore::put_batch
//! ```
//!
//! The ledger never talks to sled directly. Swapping the engine means
//! implementing four methods.

pub mod block;
pub mod db;
pub mod kv;

pub use block::{header_signing_bytes, Block, BlockHeader};
pub use db::{DbError, DbResult, LedgerDb};
pub use kv::{KvPair, KvStore, MemoryStore, SledStore};
