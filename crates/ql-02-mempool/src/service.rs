//! Mempool service: sender admission in front of the pool.

use crate::domain::{MempoolConfig, MempoolError, TransactionPool};
use crate::ports::{MempoolApi, SenderDirectory};
use parking_lot::Mutex;
use shared_types::{Hash, Transaction};
use std::sync::Arc;

/// Thread-safe mempool.
pub struct Mempool<D: SenderDirectory> {
    senders: Arc<D>,
    pool: Mutex<TransactionPool>,
}

impl<D: SenderDirectory> Mempool<D> {
    pub fn new(senders: Arc<D>, config: MempoolConfig) -> Self {
        Self {
            senders,
            pool: Mutex::new(TransactionPool::new(config)),
        }
    }
}

impl<D: SenderDirectory> MempoolApi for Mempool<D> {
    fn submit(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        if !self.senders.is_known(&tx.sender) {
            tracing::debug!("[ql-02] 🚫 Rejected tx from unknown sender {}", tx.sender);
            return Err(MempoolError::UnknownSender(tx.sender));
        }
        let hash = self.pool.lock().add(tx)?;
        tracing::debug!("[ql-02] 📥 Admitted tx {}", hash.short());
        Ok(hash)
    }

    fn drain(&self, max_count: usize) -> Vec<Transaction> {
        let drained = self.pool.lock().drain(max_count);
        if !drained.is_empty() {
            tracing::debug!("[ql-02] 📤 Drained {} txs for proposal", drained.len());
        }
        drained
    }

    fn prune(&self, included: &[Transaction]) -> usize {
        self.pool.lock().remove_all(included)
    }

    fn len(&self) -> usize {
        self.pool.lock().len()
    }
}
