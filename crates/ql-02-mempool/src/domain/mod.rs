//! Mempool domain.

pub mod errors;
pub mod pool;

pub use errors::MempoolError;
pub use pool::{MempoolConfig, TransactionPool};
