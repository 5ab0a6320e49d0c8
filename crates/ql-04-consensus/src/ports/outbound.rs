//! Driven ports (Outbound dependencies)

use crate::domain::Participation;
use async_trait::async_trait;
use shared_types::{Block, Hash, NodeId, Timestamp, VotePhase};
use std::collections::BTreeSet;

/// Ledger access needed to build and commit blocks.
pub trait ChainGateway: Send + Sync {
    /// Current tip.
    fn tip(&self) -> Block;

    /// Full `append` checks without committing.
    fn check_candidate(&self, block: &Block) -> Result<(), String>;

    /// Commit a finalized block.
    fn append(&self, block: Block) -> Result<(), String>;

    /// Whether a committed block already carries the transaction with this hash.
    fn contains_transaction(&self, tx_hash: &Hash) -> bool;
}

/// "Ask peer for vote" capability.
///
/// Implementations may make a network round-trip or simulate the answer;
/// the engine only sees the boolean. Callers bound each call with a timeout.
#[async_trait]
pub trait VoteSolicitor: Send + Sync {
    /// `Ok(true)` if `peer` casts a `phase` vote for `block`, `Ok(false)` if it
    /// refuses, `Err` if it could not be reached.
    async fn request_vote(&self, peer: &NodeId, block: &Block, phase: VotePhase)
        -> Result<bool, String>;
}

/// Receives participation outcomes for reputation scoring.
pub trait ReputationSink: Send + Sync {
    fn record(&self, peer: &NodeId, outcome: Participation);
}

/// The local node's quorum slice.
pub trait QuorumSliceProvider: Send + Sync {
    fn quorum_slice(&self) -> BTreeSet<NodeId>;
}

/// Time source for block and vote timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        shared_types::unix_now()
    }
}
