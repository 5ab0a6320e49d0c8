//! Proposal records and the values the engine hands back to callers.

use super::state::ConsensusState;
use shared_types::{Block, Timestamp, VotePhase};
use std::time::Duration;

/// Consensus configuration.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Per-peer bound on a vote request.
    pub vote_timeout: Duration,
    /// Proposals kept for re-attempt; the oldest is dropped beyond this.
    pub retry_queue_capacity: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            vote_timeout: Duration::from_secs(3),
            retry_queue_capacity: 64,
        }
    }
}

/// A block this node proposed and is driving through the phases.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub block: Block,
    pub state: ConsensusState,
    pub attempts: u32,
    pub created_at: Timestamp,
}

impl Proposal {
    pub fn new(block: Block, created_at: Timestamp) -> Self {
        Self {
            block,
            state: ConsensusState::Pending,
            attempts: 0,
            created_at,
        }
    }
}

/// How a solicited peer responded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    /// Cast the requested vote.
    Voted,
    /// Answered but refused.
    Declined,
    /// Did not answer within the timeout.
    Unreachable,
}

/// Result of driving a proposal.
#[derive(Debug, Clone)]
pub enum ProposalOutcome {
    /// All four phases were quorate and the block is on the ledger.
    Finalized(Block),
    /// Quorum was not reached at `phase`; the proposal waits in the retry queue.
    Queued { block: Block, phase: VotePhase },
}

impl ProposalOutcome {
    pub fn is_finalized(&self) -> bool {
        matches!(self, ProposalOutcome::Finalized(_))
    }

    pub fn block(&self) -> &Block {
        match self {
            ProposalOutcome::Finalized(block) => block,
            ProposalOutcome::Queued { block, .. } => block,
        }
    }

    /// `(finalized, block)` pair.
    pub fn into_parts(self) -> (bool, Block) {
        match self {
            ProposalOutcome::Finalized(block) => (true, block),
            ProposalOutcome::Queued { block, .. } => (false, block),
        }
    }
}

/// Result of recording an inbound vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    /// `false` if the voter had already voted this phase.
    pub recorded: bool,
    /// State of the local proposal for this block, if we track one.
    pub state: Option<ConsensusState>,
}

/// What one pass over the retry queue did.
#[derive(Debug, Clone, Default)]
pub struct RetryReport {
    /// Proposals that reached the ledger, rebuilt ones included.
    pub finalized: Vec<Block>,
    /// Proposals still short of quorum on an unchanged tip.
    pub requeued: usize,
    /// Replacements for outdated proposals, built on the current tip and
    /// waiting for quorum.
    pub rebuilt: Vec<Block>,
    /// Outdated proposals whose transactions are all on chain already.
    pub dropped: Vec<Block>,
}
