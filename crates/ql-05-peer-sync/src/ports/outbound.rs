//! Driven ports (Outbound dependencies)

use crate::domain::{PeerMessage, PeerReply, SyncResult};
use async_trait::async_trait;
use shared_types::{Block, NodeId};

/// Request/response transport to other nodes.
///
/// Implementations resolve `peer` to an address themselves. Errors should be
/// `SyncError::PeerUnreachable`; callers add their own timeout.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    async fn send(&self, peer: &NodeId, message: &PeerMessage) -> SyncResult<PeerReply>;
}

/// Reputation-relevant things a peer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    /// Sent a block we committed.
    BlockAccepted,
    /// Sent a block that failed validation.
    BlockRejected,
    /// Re-sent a block we already had. Counts as liveness only.
    DuplicateBlock,
    /// Did not answer a send.
    Unreachable,
}

/// Known peers and their reputation, backed by the validator registry.
pub trait PeerDirectory: Send + Sync {
    /// Every known peer except the local node.
    fn peers(&self) -> Vec<NodeId>;

    fn record(&self, peer: &NodeId, event: PeerEvent);
}

/// Notified after blocks from a peer change the local chain.
pub trait ChainObserver: Send + Sync {
    /// `added` are now on the chain, oldest first. `dropped` were cut off by
    /// a reorganization.
    fn on_commit(&self, added: &[Block], dropped: &[Block]);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ChainObserver for NoopObserver {
    fn on_commit(&self, _added: &[Block], _dropped: &[Block]) {}
}
