//! Pending transaction pool.
//!
//! A plain FIFO. Insertion order is the Merkle leaf order of the next
//! block, so there is no priority, no eviction and no reordering. The only
//! non-trivial operation is [`PendingPool::restore_front`], which puts a
//! drained batch back exactly where it was when a seal fails.
//!
//! The pool is not synchronized on its own; it lives inside the ledger's
//! state mutex together with the wallets it must stay consistent with.

use std::collections::VecDeque;

use crate::transaction::TransactionRecord;

#[derive(Debug, Default)]
pub struct PendingPool {
    queue: VecDeque<TransactionRecord>,
}

impl PendingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records. Sorted by submission sequence.
    pub fn from_records(mut records: Vec<TransactionRecord>) -> Self {
        records.sort_by_key(|r| r.sequence);
        Self {
            queue: records.into(),
        }
    }

    pub fn push(&mut self, record: TransactionRecord) {
        self.queue.push_back(record);
    }

    /// Take everything, oldest first.
    pub fn drain_all(&mut self) -> Vec<TransactionRecord> {
        self.queue.drain(..).collect()
    }

    /// Put a drained batch back in front of anything that arrived since,
    /// preserving its internal order.
    pub fn restore_front(&mut self, batch: Vec<TransactionRecord>) {
        for record in batch.into_iter().rev() {
            self.queue.push_front(record);
        }
    }

    pub fn get(&self, tx_id: &str) -> Option<&TransactionRecord> {
        self.queue.iter().find(|r| r.tx_id == tx_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[cfg(test)]
    fn tx_ids(&self) -> Vec<String> {
        self.queue.iter().map(|r| r.tx_id.clone()).collect()
    }
}
