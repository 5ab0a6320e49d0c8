//! Consensus ports.

pub mod inbound;
pub mod outbound;

pub use inbound::ConsensusApi;
pub use outbound::{
    ChainGateway, QuorumSliceProvider, ReputationSink, SystemTimeSource, TimeSource, VoteSolicitor,
};
