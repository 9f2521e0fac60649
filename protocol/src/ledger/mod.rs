//! # Transaction Ledger
//!
//! The single authority over wallets, nonces, the pending pool and the
//! chain of sealed blocks.
//!
//! ## Architecture
//!
//! ```text
//! error.rs:  LedgerError / ValidationError
//! wallet.rs: Wallet registry entry
//! pool.rs:   FIFO pending pool (leaf order of the next block)
//! sealer.rs: SealerKey, pure batch sealing, root audit
//! mod.rs:    Ledger: the guarded state and every public operation
//! ```
//!
//! ## Concurrency
//!
//! All mutable state sits in one `parking_lot::Mutex<LedgerState>`. Two
//! things happen under it and nothing else does:
//!
//! 1. **Commit of a submission**: nonce check-and-increment, persist,
//!    enqueue.
//! 2. **A whole seal**: drain, build, persist, confirm (or roll back).
//!
//! Everything expensive that doesn't need the state (signature checks,
//! payload validation) runs before the lock is taken. Since a seal holds
//! the lock from drain to commit, no submission can land in the middle of
//! one.
//!
//! ## Nonces
//!
//! `prepare` *reads* the sender's `next_nonce`; it does not reserve it in
//! any binding sense. Two prepares in a row get the same nonce, and only
//! the first one submitted wins. The loser gets `NonceMismatch` and must
//! prepare again. That keeps each wallet's accepted nonces gapless.
//!
//! ## Persistence
//!
//! Every state change is written through [`LedgerDb`] in one atomic batch
//! *before* the in-memory state is touched. If the write fails the memory
//! state is still the old one, and the caller sees an error. A seal counts
//! as soon as its batch lands; a flush failure after that is only logged.

pub mod error;
pub mod pool;
pub mod sealer;
pub mod wallet;

pub use error::{LedgerError, LedgerResult, ValidationError};
pub use pool::PendingPool;
pub use sealer::{root_matches, seal_batch, SealedBatch, SealerKey};
pub use wallet::Wallet;

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::crypto::keys::PublicKeyBytes;
use crate::crypto::signer::scheme_by_name;
use crate::receipt::{issue_receipt, Receipt};
use crate::storage::block::Block;
use crate::storage::db::LedgerDb;
use crate::transaction::{
    validate_payload, PreparedTransaction, SubmittedTransaction, TransactionPayload,
    TransactionRecord, TransactionStatus, TxId,
};

/// Current Unix time in seconds.
fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// Everything guarded by the ledger mutex.
#[derive(Debug, Default)]
struct LedgerState {
    wallets: HashMap<String, Wallet>,
    pending: PendingPool,
    /// Index the next sealed block will get.
    next_block_index: u64,
    /// Submission counter; orders the pool across restarts.
    next_sequence: u64,
}

// ---------------------------------------------------------------------------
// Public result types
// ---------------------------------------------------------------------------

/// Outcome of an accepted submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tx_id: TxId,
    /// The block sealed by this submission reaching the threshold, if any.
    pub sealed: Option<Block>,
}

/// Point-in-time ledger counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStatus {
    /// Number of sealed blocks.
    pub height: u64,
    pub latest_block_index: Option<u64>,
    pub pending: usize,
    pub wallets: usize,
    pub sealer_public_key: PublicKeyBytes,
    pub sealer_algorithm: String,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The receipt ledger. `Send + Sync`; share it as `Arc<Ledger>`.
#[derive(Debug)]
pub struct Ledger {
    db: LedgerDb,
    config: LedgerConfig,
    sealer: SealerKey,
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Open a ledger over `db`, reloading wallets, the pending pool and the
    /// chain tip from whatever the store already holds.
    pub fn open(db: LedgerDb, config: LedgerConfig, sealer: SealerKey) -> LedgerResult<Self> {
        let wallets: HashMap<String, Wallet> = db
            .wallets()?
            .into_iter()
            .map(|w| (w.wallet_id.clone(), w))
            .collect();

        let records = db.transactions()?;
        let next_sequence = records
            .iter()
            .map(|r| r.sequence + 1)
            .max()
            .unwrap_or(0);
        let pending_records: Vec<TransactionRecord> = records
            .into_iter()
            .filter(|r| r.status == TransactionStatus::Pending)
            .collect();
        let pending = PendingPool::from_records(pending_records);

        let next_block_index = db.latest_block_index()?.map_or(0, |i| i + 1);

        info!(
            wallets = wallets.len(),
            pending = pending.len(),
            next_block_index,
            sealer = %sealer.public_key(),
            "ledger opened"
        );

        Ok(Self {
            db,
            config,
            sealer,
            state: Mutex::new(LedgerState {
                wallets,
                pending,
                next_block_index,
                next_sequence,
            }),
        })
    }

    /// A throwaway ledger on an in-memory store with a fresh sealer key.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self {
            db: LedgerDb::in_memory(),
            config,
            sealer: SealerKey::generate(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn sealer_public_key(&self) -> &PublicKeyBytes {
        self.sealer.public_key()
    }

    // -- Wallets ------------------------------------------------------------

    /// Register a wallet under a fresh random id.
    pub fn create_wallet(
        &self,
        public_key: PublicKeyBytes,
        algorithm: &str,
        user_id: Option<String>,
    ) -> LedgerResult<Wallet> {
        let wallet_id = uuid::Uuid::new_v4().to_string();
        let wallet = Wallet::new(wallet_id, public_key, algorithm, user_id, unix_now())
            .map_err(|e| {
                warn!(error = %e, "wallet registration rejected");
                e
            })?;

        let mut state = self.state.lock();
        self.db.put_wallet(&wallet)?;
        state.wallets.insert(wallet.wallet_id.clone(), wallet.clone());

        info!(
            wallet_id = %wallet.wallet_id,
            algorithm = %wallet.algorithm,
            "wallet created"
        );
        Ok(wallet)
    }

    pub fn wallet(&self, wallet_id: &str) -> LedgerResult<Wallet> {
        self.state
            .lock()
            .wallets
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownWallet(wallet_id.to_string()).into())
    }

    // -- Prepare ------------------------------------------------------------

    /// Build the payload the sender must sign, at the sender's current
    /// `next_nonce`.
    pub fn prepare(
        &self,
        from_wallet: &str,
        to_wallet: &str,
        amount: u64,
        currency: &str,
    ) -> LedgerResult<PreparedTransaction> {
        let wallet = self.wallet(from_wallet)?;
        let payload = TransactionPayload {
            from_wallet: wallet.wallet_id,
            to_wallet: to_wallet.to_string(),
            amount,
            currency: currency.to_string(),
            nonce: wallet.next_nonce,
            timestamp: unix_now(),
        };
        validate_payload(&payload).map_err(ValidationError::from)?;

        debug!(
            from = %payload.from_wallet,
            to = %payload.to_wallet,
            nonce = payload.nonce,
            "transaction prepared"
        );
        Ok(PreparedTransaction::new(payload))
    }

    // -- Submit -------------------------------------------------------------

    /// Validate and accept a signed transaction.
    ///
    /// Checks run in this order; the first failure is returned and nothing
    /// is changed:
    ///
    /// 1. sender wallet exists
    /// 2. payload is well-formed
    /// 3. `payload_hash` matches the canonical payload
    /// 4. `public_key` is the wallet's registered key
    /// 5. signature verifies (outside the lock)
    /// 6. nonce equals `next_nonce` (inside the lock, with the increment)
    ///
    /// If the pool reaches the seal threshold, a seal runs before returning.
    /// A failed seal there is logged, not returned: the submission itself
    /// was accepted and the next trigger retries.
    pub fn submit(&self, submitted: SubmittedTransaction) -> LedgerResult<Submission> {
        let result = self.accept(submitted);
        if let Err(LedgerError::Validation(e)) = &result {
            warn!(kind = e.kind(), error = %e, "submission rejected");
        }
        let (tx_id, threshold_hit) = result?;

        let sealed = if threshold_hit {
            match self.seal() {
                Ok(block) => block,
                Err(e) => {
                    error!(error = %e, "threshold seal failed, will retry on next trigger");
                    None
                }
            }
        } else {
            None
        };

        Ok(Submission { tx_id, sealed })
    }

    fn accept(&self, submitted: SubmittedTransaction) -> LedgerResult<(TxId, bool)> {
        let SubmittedTransaction {
            prepared,
            signature,
            public_key,
        } = submitted;
        let payload = prepared.payload;

        let wallet = self.wallet(&payload.from_wallet)?;
        validate_payload(&payload).map_err(ValidationError::from)?;

        let canonical = payload.canonical_bytes();
        let payload_hash = payload.hash();
        if payload_hash != prepared.payload_hash {
            return Err(ValidationError::PayloadHashMismatch.into());
        }
        if public_key != wallet.public_key {
            return Err(ValidationError::UnknownPublicKey(wallet.wallet_id).into());
        }

        let scheme = scheme_by_name(&wallet.algorithm)?;
        if !scheme.verify(&public_key, &canonical, &signature) {
            return Err(ValidationError::SignatureInvalid.into());
        }

        let mut state = self.state.lock();

        // Re-read under the lock: another submit may have advanced it.
        let current = state
            .wallets
            .get(&payload.from_wallet)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownWallet(payload.from_wallet.clone()))?;
        if payload.nonce != current.next_nonce {
            return Err(ValidationError::NonceMismatch {
                wallet_id: current.wallet_id,
                expected: current.next_nonce,
                got: payload.nonce,
            }
            .into());
        }

        let record = TransactionRecord {
            tx_id: payload.tx_id(),
            sequence: state.next_sequence,
            payload,
            payload_hash,
            signature,
            public_key,
            algorithm: wallet.algorithm,
            status: TransactionStatus::Pending,
            block_index: None,
            merkle_proof: None,
            submitted_at: unix_now(),
        };
        let advanced = current.advanced();

        self.db.commit_submission(&advanced, &record)?;

        let tx_id = record.tx_id.clone();
        debug!(
            tx_id = %tx_id,
            from = %record.payload.from_wallet,
            nonce = record.payload.nonce,
            "transaction accepted"
        );

        state.wallets.insert(advanced.wallet_id.clone(), advanced);
        state.pending.push(record);
        state.next_sequence += 1;

        let threshold_hit = self.config.threshold_reached(state.pending.len());
        Ok((tx_id, threshold_hit))
    }

    // -- Seal ---------------------------------------------------------------

    /// Seal everything pending into the next block.
    ///
    /// `Ok(None)` when the pool is empty; no empty blocks are ever made.
    /// On error the drained transactions are back in the pool, in their
    /// original order and ahead of anything newer, and the block index has
    /// not moved. A flush failure after the batch commit is not an error:
    /// the block is already visible in storage, so it stands.
    pub fn seal(&self) -> LedgerResult<Option<Block>> {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let index = state.next_block_index;
        let batch = state.pending.drain_all();

        let outcome = seal_batch(&batch, index, unix_now(), &self.sealer).and_then(|sealed| {
            self.db.commit_seal(&sealed.block, &sealed.confirmed)?;
            Ok(sealed)
        });

        match outcome {
            Ok(sealed) => {
                state.next_block_index += 1;
                if let Err(e) = self.db.flush() {
                    warn!(index, error = %e, "block committed but flush failed");
                }
                info!(
                    index,
                    tx_count = sealed.block.tx_count(),
                    merkle_root = %sealed.block.header.merkle_root_hex(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "block sealed"
                );
                Ok(Some(sealed.block))
            }
            Err(e) => {
                let restored = batch.len();
                state.pending.restore_front(batch);
                error!(
                    index,
                    restored,
                    error = %e,
                    "seal failed, drained transactions returned to pool"
                );
                Err(e)
            }
        }
    }

    // -- Queries ------------------------------------------------------------

    /// The stored record of `tx_id`, pending or confirmed.
    pub fn transaction(&self, tx_id: &str) -> LedgerResult<TransactionRecord> {
        if let Some(record) = self.state.lock().pending.get(tx_id) {
            return Ok(record.clone());
        }
        self.db
            .get_transaction(tx_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {tx_id}")))
    }

    pub fn transaction_status(&self, tx_id: &str) -> LedgerResult<TransactionStatus> {
        self.transaction(tx_id).map(|r| r.status)
    }

    pub fn block(&self, index: u64) -> LedgerResult<Block> {
        self.db
            .get_block(index)?
            .ok_or_else(|| LedgerError::NotFound(format!("block {index}")))
    }

    /// Rebuild block `index`'s Merkle root from its stored records.
    pub fn audit_block(&self, index: u64) -> LedgerResult<bool> {
        let block = self.block(index)?;
        let records = block
            .transaction_ids
            .iter()
            .map(|id| {
                self.db.get_transaction(id)?.ok_or_else(|| {
                    LedgerError::Internal(format!("block {index} names missing transaction {id}"))
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        root_matches(&block, &records)
    }

    /// Assemble the receipt of a confirmed transaction from stored data.
    pub fn get_receipt(&self, tx_id: &str) -> LedgerResult<Receipt> {
        let record = self.transaction(tx_id)?;
        if !record.is_confirmed() {
            return Err(LedgerError::NotConfirmed(tx_id.to_string()));
        }
        let index = record.block_index.ok_or_else(|| {
            LedgerError::Internal(format!("confirmed transaction {tx_id} has no block index"))
        })?;
        let block = self.block(index)?;
        if block.position_of(tx_id).is_none() {
            return Err(LedgerError::Internal(format!(
                "block {index} does not list transaction {tx_id}"
            )));
        }
        issue_receipt(&record, &block.header)
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn status(&self) -> LedgerStatus {
        let state = self.state.lock();
        LedgerStatus {
            height: state.next_block_index,
            latest_block_index: state.next_block_index.checked_sub(1),
            pending: state.pending.len(),
            wallets: state.wallets.len(),
            sealer_public_key: self.sealer.public_key().clone(),
            sealer_algorithm: self.sealer.algorithm().to_string(),
        }
    }
}
