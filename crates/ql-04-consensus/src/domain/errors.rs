//! Error types for the consensus engine.

use super::state::ConsensusState;
use shared_types::{Hash, NodeId, VotePhase};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    /// Finalize requested for a block that was already finalized. Callers treat
    /// this as a no-op.
    #[error("Block {0} already finalized")]
    AlreadyFinalized(Hash),

    #[error("No proposal tracked for block {0}")]
    UnknownProposal(Hash),

    #[error("Block {hash} cannot be finalized from state {state}")]
    NotConfirmed { hash: Hash, state: ConsensusState },

    #[error("Local quorum slice is empty")]
    EmptyQuorumSlice,

    #[error("Voter {voter} is not in the local quorum slice")]
    NotInQuorumSlice { voter: NodeId },

    /// Quorum not reached within the vote window. Used for logging only: the
    /// proposal is queued for retry and callers see `ProposalOutcome::Queued`.
    #[error("Quorum not reached for {hash} at phase {phase}")]
    QuorumTimeout { hash: Hash, phase: VotePhase },

    #[error("Candidate block rejected: {0}")]
    InvalidCandidate(String),

    #[error("Ledger rejected finalized block: {0}")]
    Ledger(String),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
