//! Error types for peer sync.

use ql_01_ledger_store::LedgerError;
use shared_types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Transport failure or timeout. Logged and charged to the peer's
    /// reputation; never blocks delivery to other peers.
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: NodeId, reason: String },

    #[error("Unexpected reply from {peer}: {reply}")]
    UnexpectedReply { peer: NodeId, reply: String },

    #[error("Chain from {peer} not adopted: {reason}")]
    RemoteChainRejected { peer: NodeId, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SyncError {
    pub fn unreachable(peer: &NodeId, reason: impl ToString) -> Self {
        SyncError::PeerUnreachable {
            peer: peer.clone(),
            reason: reason.to_string(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
