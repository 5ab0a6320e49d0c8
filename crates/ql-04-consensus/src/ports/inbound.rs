//! Driving ports (Inbound API)

use crate::domain::{ConsensusResult, ConsensusState, ProposalOutcome, RetryReport, VoteOutcome};
use async_trait::async_trait;
use shared_types::{Block, Hash, Transaction, Vote, VotePhase};

/// Consensus engine API.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// Build a block on the current tip from `transactions`, sign it, and
    /// drive it through nominate → vote → accept → confirm.
    ///
    /// ## Errors
    ///
    /// - `EmptyQuorumSlice`: the local slice has no members
    /// - `Ledger`: every phase was quorate but the ledger refused the block
    async fn propose_block(&self, transactions: Vec<Transaction>)
        -> ConsensusResult<ProposalOutcome>;

    /// Record a vote delivered by a peer and advance the local proposal if it
    /// is now quorate.
    fn on_peer_vote(&self, vote: Vote) -> ConsensusResult<VoteOutcome>;

    /// Answer a peer's request to vote `phase` on `block`.
    fn answer_vote_request(&self, block: &Block, phase: VotePhase) -> ConsensusResult<Vote>;

    /// Re-drive every queued proposal once.
    ///
    /// A proposal whose parent is no longer the tip, or that the ledger
    /// refused, is rebuilt on the current tip from its transactions that are
    /// not yet on chain. Transactions never go back to the mempool.
    async fn retry_pending(&self) -> RetryReport;

    /// `block` reached the ledger by another path.
    fn mark_finalized(&self, block: &Block);

    fn state_of(&self, hash: &Hash) -> Option<ConsensusState>;

    /// Proposals waiting in the retry queue.
    fn pending_retries(&self) -> usize;
}
