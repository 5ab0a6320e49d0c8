//! Inbound (Driving) ports for the Mempool subsystem.

use crate::domain::MempoolError;
use shared_types::{Hash, Transaction};

/// Primary mempool API.
pub trait MempoolApi: Send + Sync {
    /// Admit a transaction. Returns its hash.
    fn submit(&self, tx: Transaction) -> Result<Hash, MempoolError>;

    /// Remove and return up to `max_count` transactions, oldest first.
    fn drain(&self, max_count: usize) -> Vec<Transaction>;

    /// Drop pooled transactions that appear in `included`.
    fn prune(&self, included: &[Transaction]) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
