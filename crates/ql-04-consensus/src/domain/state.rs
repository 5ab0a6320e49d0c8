//! Per-block consensus state machine.

use shared_types::VotePhase;
use std::fmt;

/// `pending → nominated → voted → accepted → confirmed → finalized`.
///
/// Transitions only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsensusState {
    Pending,
    Nominated,
    Voted,
    Accepted,
    Confirmed,
    Finalized,
}

impl ConsensusState {
    /// The phase whose quorum this state is waiting on.
    pub fn awaiting(self) -> Option<VotePhase> {
        match self {
            ConsensusState::Pending => Some(VotePhase::Nominate),
            ConsensusState::Nominated => Some(VotePhase::Vote),
            ConsensusState::Voted => Some(VotePhase::Accept),
            ConsensusState::Accepted => Some(VotePhase::Confirm),
            ConsensusState::Confirmed | ConsensusState::Finalized => None,
        }
    }

    /// State reached once `phase` is quorate.
    pub fn after(phase: VotePhase) -> ConsensusState {
        match phase {
            VotePhase::Nominate => ConsensusState::Nominated,
            VotePhase::Vote => ConsensusState::Voted,
            VotePhase::Accept => ConsensusState::Accepted,
            VotePhase::Confirm => ConsensusState::Confirmed,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConsensusState::Finalized
    }
}

impl fmt::Display for ConsensusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsensusState::Pending => "pending",
            ConsensusState::Nominated => "nominated",
            ConsensusState::Voted => "voted",
            ConsensusState::Accepted => "accepted",
            ConsensusState::Confirmed => "confirmed",
            ConsensusState::Finalized => "finalized",
        };
        f.write_str(name)
    }
}
