//! Outbound (Driven) ports for the Mempool subsystem.

use shared_types::NodeId;

/// Answers whether an identity may originate transactions.
pub trait SenderDirectory: Send + Sync {
    fn is_known(&self, id: &NodeId) -> bool;
}
