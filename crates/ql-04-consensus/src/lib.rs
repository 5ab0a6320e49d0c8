//! # ql-04-consensus
//!
//! Federated voting over quorum slices.
//!
//! ## Architecture
//!
//! Each block this node proposes walks four phases. A phase completes when
//! `floor(n/2) + 1` distinct members of the local quorum slice have voted
//! for it:
//!
//! ```text
//! pending ─nominate→ nominated ─vote→ voted ─accept→ accepted ─confirm→ confirmed ─→ finalized
//!                                                                              (ledger append)
//! ```
//!
//! The node votes for its own proposal first, then asks the remaining slice
//! members in parallel through [`ports::VoteSolicitor`], each request bounded
//! by `ConsensusConfig::vote_timeout`. Every answer (or silence) is reported
//! to a [`ports::ReputationSink`].
//!
//! A phase that misses quorum parks the proposal in a bounded FIFO retry
//! queue. `retry_pending` re-drives it later. Once the tip has moved past its
//! parent it is rebuilt on the new tip from whatever transactions the chain
//! does not already carry; if none are left it is dropped.
//!
//! Finalization appends to the ledger exactly once per block hash; repeated
//! finalize attempts return `AlreadyFinalized`. Votes and finalization marks
//! for blocks below the tip are pruned as the chain grows.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ql_04_consensus::{ConsensusApi, ConsensusConfig, ConsensusEngine};
//!
//! let engine = ConsensusEngine::new(chain, solicitor, reputation, slices, signer, ConsensusConfig::default());
//! match engine.propose_block(txs).await? {
//!     ProposalOutcome::Finalized(block) => broadcast(block),
//!     ProposalOutcome::Queued { .. } => {}
//! }
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    quorum_threshold, ConsensusConfig, ConsensusError, ConsensusResult, ConsensusState,
    Participation, ProposalOutcome, RetryReport, VoteOutcome,
};
pub use ports::{
    ChainGateway, ConsensusApi, QuorumSliceProvider, ReputationSink, SystemTimeSource, TimeSource,
    VoteSolicitor,
};
pub use service::ConsensusEngine;
