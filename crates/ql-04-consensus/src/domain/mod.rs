//! Consensus domain: states, tallies, thresholds, retry scheduling.

pub mod errors;
pub mod proposal;
pub mod quorum;
pub mod retry;
pub mod state;

pub use errors::{ConsensusError, ConsensusResult};
pub use proposal::{ConsensusConfig, Participation, Proposal, ProposalOutcome, RetryReport, VoteOutcome};
pub use quorum::{quorum_threshold, VoteTally};
pub use retry::RetryQueue;
pub use state::ConsensusState;
