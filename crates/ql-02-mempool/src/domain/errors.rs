//! Mempool error types.

use shared_types::{Hash, NodeId};
use thiserror::Error;

/// Mempool error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Sender is not a known account or validator.
    #[error("Unknown sender: {0}")]
    UnknownSender(NodeId),

    /// Amount is negative or not a finite number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transaction already exists in the pool.
    #[error("Duplicate transaction: {}", .0.short())]
    DuplicateTransaction(Hash),

    /// Pool has reached maximum capacity.
    #[error("Pool full at {capacity} transactions")]
    PoolFull { capacity: usize },
}
