//! # Transaction Pool
//!
//! FIFO queue with a hash index for duplicate suppression.
//!
//! ## Invariants Enforced
//!
//! - No two pooled transactions share a canonical hash
//! - `drain` returns transactions in admission order
//! - Pool size never exceeds `capacity`

use super::errors::MempoolError;
use shared_types::{hash_transaction, Hash, Transaction};
use std::collections::{HashSet, VecDeque};

/// Mempool configuration.
#[derive(Clone, Debug)]
pub struct MempoolConfig {
    /// Maximum number of pooled transactions.
    pub capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

/// FIFO transaction pool.
#[derive(Debug)]
pub struct TransactionPool {
    config: MempoolConfig,
    queue: VecDeque<(Hash, Transaction)>,
    index: HashSet<Hash>,
}

impl TransactionPool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    /// Append `tx` after amount, duplicate and capacity checks.
    ///
    /// Sender admission is the service's concern.
    pub fn add(&mut self, tx: Transaction) -> Result<Hash, MempoolError> {
        if !tx.amount.is_finite() || tx.amount < 0.0 {
            return Err(MempoolError::InvalidAmount(tx.amount.to_string()));
        }
        let hash = hash_transaction(&tx);
        if self.index.contains(&hash) {
            return Err(MempoolError::DuplicateTransaction(hash));
        }
        if self.queue.len() >= self.config.capacity {
            return Err(MempoolError::PoolFull {
                capacity: self.config.capacity,
            });
        }
        self.index.insert(hash);
        self.queue.push_back((hash, tx));
        Ok(hash)
    }

    /// Remove and return up to `max_count` transactions in FIFO order.
    pub fn drain(&mut self, max_count: usize) -> Vec<Transaction> {
        let take = max_count.min(self.queue.len());
        self.queue
            .drain(..take)
            .map(|(hash, tx)| {
                self.index.remove(&hash);
                tx
            })
            .collect()
    }

    /// Remove any pooled transaction that appears in `included`.
    pub fn remove_all(&mut self, included: &[Transaction]) -> usize {
        let hashes: HashSet<Hash> = included
            .iter()
            .map(hash_transaction)
            .filter(|h| self.index.contains(h))
            .collect();
        if hashes.is_empty() {
            return 0;
        }
        self.queue.retain(|(hash, _)| !hashes.contains(hash));
        for hash in &hashes {
            self.index.remove(hash);
        }
        hashes.len()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.index.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
