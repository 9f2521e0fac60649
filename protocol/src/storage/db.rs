//! # LedgerDb: Typed Persistence
//!
//! Typed records on top of any [`KvStore`]. All on-disk values are bincode;
//! JSON is for the API, bincode is for storage.
//!
//! ## Key Layout
//!
//! Everything shares one keyspace, partitioned by prefix:
//!
//! | Prefix      | Key suffix          | Value                        |
//! |-------------|---------------------|------------------------------|
//! | `wallet/`   | wallet id (UTF-8)   | `bincode(Wallet)`            |
//! | `tx/`       | tx id (hex UTF-8)   | `bincode(TransactionRecord)` |
//! | `block/`    | index (8B BE)       | `bincode(Block)`             |
//! | `meta/`     | key (UTF-8)         | raw bytes                    |
//!
//! Block indices are big-endian so that lexicographic key order matches
//! numeric order and a prefix scan returns blocks in chain order.
//!
//! ## Atomicity
//!
//! The two state transitions of the ledger each map to one `put_batch`:
//!
//! - **submit**: the sender's wallet (nonce bumped) + the new Pending record.
//! - **seal**: the block + every record it confirms + the new tip.
//!
//! Either everything lands or nothing does.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::block::Block;
use super::kv::{KvPair, KvStore, MemoryStore, SledStore};
use crate::ledger::wallet::Wallet;
use crate::transaction::TransactionRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Failure reported by a non-sled engine.
    #[error("storage engine error: {0}")]
    Engine(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

const WALLET_PREFIX: &[u8] = b"wallet/";
const TX_PREFIX: &[u8] = b"tx/";
const BLOCK_PREFIX: &[u8] = b"block/";

/// Index of the most recently sealed block (8B BE).
const META_TIP: &[u8] = b"meta/tip";

fn prefixed(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

fn wallet_key(wallet_id: &str) -> Vec<u8> {
    prefixed(WALLET_PREFIX, wallet_id.as_bytes())
}

fn tx_key(tx_id: &str) -> Vec<u8> {
    prefixed(TX_PREFIX, tx_id.as_bytes())
}

fn block_key(index: u64) -> Vec<u8> {
    prefixed(BLOCK_PREFIX, &index.to_be_bytes())
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Corrupt {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Typed accessors for wallets, transaction records, blocks and the tip.
///
/// Cheap to clone: the engine is shared behind an `Arc`.
#[derive(Clone)]
pub struct LedgerDb {
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for LedgerDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerDb").finish_non_exhaustive()
    }
}

impl LedgerDb {
    /// Wrap an arbitrary engine.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// sled database at `path`, created if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::new(Arc::new(SledStore::open(path)?)))
    }

    /// sled database deleted on drop.
    pub fn open_temporary() -> DbResult<Self> {
        Ok(Self::new(Arc::new(SledStore::open_temporary()?)))
    }

    /// Purely in-memory database.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn get_typed<T: DeserializeOwned>(&self, key: &[u8]) -> DbResult<Option<T>> {
        self.store
            .get(key)?
            .map(|bytes| decode(key, &bytes))
            .transpose()
    }

    fn scan_typed<T: DeserializeOwned>(&self, prefix: &[u8]) -> DbResult<Vec<T>> {
        self.store
            .scan_prefix(prefix)?
            .iter()
            .map(|(k, v)| decode(k, v))
            .collect()
    }

    // -- Wallets ------------------------------------------------------------

    pub fn put_wallet(&self, wallet: &Wallet) -> DbResult<()> {
        self.store
            .put(&wallet_key(&wallet.wallet_id), &encode(wallet)?)
    }

    pub fn get_wallet(&self, wallet_id: &str) -> DbResult<Option<Wallet>> {
        self.get_typed(&wallet_key(wallet_id))
    }

    /// Every registered wallet, ordered by id.
    pub fn wallets(&self) -> DbResult<Vec<Wallet>> {
        self.scan_typed(WALLET_PREFIX)
    }

    // -- Transactions -------------------------------------------------------

    pub fn get_transaction(&self, tx_id: &str) -> DbResult<Option<TransactionRecord>> {
        self.get_typed(&tx_key(tx_id))
    }

    /// Every stored record, ordered by tx id (not by submission).
    pub fn transactions(&self) -> DbResult<Vec<TransactionRecord>> {
        self.scan_typed(TX_PREFIX)
    }

    /// Persist an accepted submission together with the sender's updated
    /// wallet.
    pub fn commit_submission(&self, wallet: &Wallet, record: &TransactionRecord) -> DbResult<()> {
        let entries = vec![
            (wallet_key(&wallet.wallet_id), encode(wallet)?),
            (tx_key(&record.tx_id), encode(record)?),
        ];
        self.store.put_batch(entries)
    }

    // -- Blocks -------------------------------------------------------------

    pub fn get_block(&self, index: u64) -> DbResult<Option<Block>> {
        self.get_typed(&block_key(index))
    }

    /// Persist a sealed block, its confirmed records and the new tip in one
    /// atomic batch. Once this returns `Ok` the seal is committed; durability
    /// is a separate [`LedgerDb::flush`].
    pub fn commit_seal(&self, block: &Block, confirmed: &[TransactionRecord]) -> DbResult<()> {
        let mut entries: Vec<KvPair> = Vec::with_capacity(confirmed.len() + 2);
        entries.push((block_key(block.index()), encode(block)?));
        for record in confirmed {
            entries.push((tx_key(&record.tx_id), encode(record)?));
        }
        entries.push((META_TIP.to_vec(), block.index().to_be_bytes().to_vec()));
        self.store.put_batch(entries)
    }

    /// Index of the latest sealed block, `None` before the first seal.
    pub fn latest_block_index(&self) -> DbResult<Option<u64>> {
        match self.store.get(META_TIP)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| DbError::Corrupt {
                    key: "meta/tip".to_string(),
                    reason: format!("expected 8 bytes, got {}", bytes.len()),
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Push committed writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.store.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{PublicKeyBytes, SignatureBytes};
    use crate::storage::block::BlockHeader;
    use crate::transaction::{TransactionPayload, TransactionStatus};

    fn wallet(id: &str, next_nonce: u64) -> Wallet {
        Wallet {
            wallet_id: id.to_string(),
            user_id: None,
            public_key: PublicKeyBytes::new(vec![1u8; 32]),
            algorithm: "ed25519".into(),
            next_nonce,
            created_at: 1_700_000_000,
        }
    }

    fn record(nonce: u64) -> TransactionRecord {
        let payload = TransactionPayload {
            from_wallet: "w1".into(),
            to_wallet: "w2".into(),
            amount: 100,
            currency: "USD".into(),
            nonce,
            timestamp: 1_700_000_000,
        };
        TransactionRecord {
            tx_id: payload.tx_id(),
            sequence: nonce,
            payload_hash: payload.hash(),
            payload,
            signature: SignatureBytes::new(vec![3u8; 64]),
            public_key: PublicKeyBytes::new(vec![1u8; 32]),
            algorithm: "ed25519".into(),
            status: TransactionStatus::Pending,
            block_index: None,
            merkle_proof: None,
            submitted_at: 1_700_000_000,
        }
    }

    fn block(index: u64, ids: Vec<String>) -> Block {
        Block {
            header: BlockHeader {
                index,
                sealed_at: 1_700_000_100,
                merkle_root: [index as u8; 32],
                sealer_public_key: PublicKeyBytes::new(vec![9u8; 32]),
                sealer_signature: SignatureBytes::new(vec![8u8; 64]),
            },
            transaction_ids: ids,
        }
    }

    #[test]
    fn test_wallet_crud() {
        let db = LedgerDb::in_memory();
        assert!(db.get_wallet("w1").unwrap().is_none());

        db.put_wallet(&wallet("w1", 0)).unwrap();
        db.put_wallet(&wallet("w0", 5)).unwrap();

        assert_eq!(db.get_wallet("w1").unwrap(), Some(wallet("w1", 0)));
        let ids: Vec<String> = db.wallets().unwrap().into_iter().map(|w| w.wallet_id).collect();
        assert_eq!(ids, vec!["w0", "w1"]);
    }

    #[test]
    fn test_commit_submission_writes_both() {
        let db = LedgerDb::in_memory();
        let rec = record(0);
        db.commit_submission(&wallet("w1", 1), &rec).unwrap();

        assert_eq!(db.get_wallet("w1").unwrap().unwrap().next_nonce, 1);
        assert_eq!(db.get_transaction(&rec.tx_id).unwrap(), Some(rec));
        assert_eq!(db.transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_seal_updates_tip_and_records() {
        let db = LedgerDb::open_temporary().unwrap();
        assert_eq!(db.latest_block_index().unwrap(), None);

        let rec = record(0);
        let b0 = block(0, vec![rec.tx_id.clone()]);
        let confirmed = rec.confirmed(0, vec![]);
        db.commit_seal(&b0, &[confirmed.clone()]).unwrap();

        assert_eq!(db.latest_block_index().unwrap(), Some(0));
        assert_eq!(db.get_block(0).unwrap(), Some(b0));
        assert_eq!(db.get_transaction(&rec.tx_id).unwrap(), Some(confirmed));
    }

    #[test]
    fn test_block_keys_scan_in_index_order() {
        let store = Arc::new(MemoryStore::new());
        let db = LedgerDb::new(store.clone());
        // 256 sorts before 2 as a decimal string but not as 8B BE.
        for index in [256u64, 2, 0, 1] {
            db.commit_seal(&block(index, vec![]), &[]).unwrap();
        }
        let indices: Vec<u64> = store
            .scan_prefix(BLOCK_PREFIX)
            .unwrap()
            .iter()
            .map(|(key, _)| u64::from_be_bytes(key[BLOCK_PREFIX.len()..].try_into().unwrap()))
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 256]);
        assert!(db.get_block(3).unwrap().is_none());
        assert_eq!(db.latest_block_index().unwrap(), Some(1));
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.put(b"wallet/bad", b"\x01").unwrap();
        let db = LedgerDb::new(store);
        assert!(matches!(
            db.get_wallet("bad"),
            Err(DbError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = LedgerDb::open(dir.path()).unwrap();
            db.put_wallet(&wallet("w1", 2)).unwrap();
            db.commit_seal(&block(0, vec![]), &[]).unwrap();
        }
        let db = LedgerDb::open(dir.path()).unwrap();
        assert_eq!(db.get_wallet("w1").unwrap().unwrap().next_nonce, 2);
        assert_eq!(db.latest_block_index().unwrap(), Some(0));
    }
}
