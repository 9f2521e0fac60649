//! # Key-Value Engines
//!
//! The ledger only ever needs four things from a storage engine: point
//! reads, point writes, an atomic multi-key write, and a prefix scan. That
//! is the whole [`KvStore`] trait, and anything that can do those four can
//! back a ledger.
//!
//! Two engines ship:
//!
//! | Engine        | Backing                         | Use                         |
//! |---------------|---------------------------------|-----------------------------|
//! | [`SledStore`] | sled, on disk or temporary      | the node                    |
//! | [`MemoryStore`] | `BTreeMap` behind an `RwLock` | unit tests, throwaway demos |
//!
//! ## Atomicity
//!
//! `put_batch` is all-or-nothing. The sealer relies on it: a block, the
//! records it confirms, and the new chain tip land together or not at all.
//! sled gives us that through `Tree::apply_batch`; the memory engine holds
//! its write lock for the whole batch.

use parking_lot::RwLock;
use sled::{Batch, Db, Tree};
use std::collections::BTreeMap;
use std::path::Path;

use super::db::DbResult;

/// One key/value pair of a batch or a scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Minimal storage engine contract.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> DbResult<()>;

    /// Write every pair atomically.
    fn put_batch(&self, entries: Vec<KvPair>) -> DbResult<()>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<KvPair>>;

    /// Make previous writes durable. No-op for volatile engines.
    fn flush(&self) -> DbResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SledStore
// ---------------------------------------------------------------------------

/// sled-backed engine. Everything lives in one named tree so that a single
/// `apply_batch` covers every key the ledger writes.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    ledger: Tree,
}

impl SledStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that is deleted when dropped. Ideal for tests.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let ledger = db.open_tree("ledger")?;
        Ok(Self { db, ledger })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.ledger.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.ledger.insert(key, value)?;
        Ok(())
    }

    fn put_batch(&self, entries: Vec<KvPair>) -> DbResult<()> {
        let mut batch = Batch::default();
        for (key, value) in entries {
            batch.insert(key, value);
        }
        self.ledger.apply_batch(batch)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<KvPair>> {
        self.ledger
            .scan_prefix(prefix)
            .map(|item| -> DbResult<KvPair> {
                let (k, v) = item?;
                Ok((k.to_vec(), v.to_vec()))
            })
            .collect()
    }

    fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Volatile engine over a sorted map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_batch(&self, entries: Vec<KvPair>) -> DbResult<()> {
        let mut map = self.map.write();
        map.extend(entries);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<KvPair>> {
        let map = self.map.read();
        Ok(map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
