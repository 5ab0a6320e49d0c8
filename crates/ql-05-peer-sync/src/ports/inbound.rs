//! Driving ports (Inbound API)

use crate::domain::{ReceiveOutcome, SyncResult};
use async_trait::async_trait;
use shared_types::{Block, NodeId};

/// Result of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<NodeId>,
    pub failed: Vec<NodeId>,
}

/// Result of a catch-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchUpOutcome {
    pub adopted: bool,
    /// Local chain length afterwards.
    pub height: u64,
}

/// Peer sync API.
#[async_trait]
pub trait PeerSyncApi: Send + Sync {
    /// Handle a block delivered by `sender` (or by nobody, for local replays).
    ///
    /// A committed block is re-broadcast to every peer except `sender`.
    ///
    /// ## Errors
    ///
    /// - `Ledger(PrevHashMismatch)`: the block links to nothing on the local chain
    /// - `Ledger(..)`: any other validation failure
    async fn receive_block(
        &self,
        block: Block,
        sender: Option<NodeId>,
    ) -> SyncResult<ReceiveOutcome>;

    /// Best-effort `SEND_BLOCK` to every known peer except `exclude`.
    async fn broadcast(&self, block: &Block, exclude: Option<&NodeId>) -> BroadcastReport;

    /// Adopt `peer`'s chain if it validates, shares our genesis and is longer.
    async fn catch_up(&self, peer: &NodeId) -> SyncResult<CatchUpOutcome>;
}
