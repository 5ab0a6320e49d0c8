//! # Adapters
//!
//! Concrete implementations of the subsystem ports:
//!
//! - `ports/` - subsystem-to-subsystem adapters (registry, ledger, observer)
//! - `network` - HTTP peer transport and network vote solicitation
//! - `simulator` - registry-driven vote simulation
//! - `keys` - node key file

pub mod keys;
pub mod network;
pub mod ports;
pub mod simulator;

pub use network::{HttpPeerNetwork, NetworkSolicitor};
pub use ports::{CommitObserver, LedgerGateway, RegistryDirectory};
pub use simulator::SimulatedSolicitor;

use async_trait::async_trait;
use ql_03_validator_registry::RegistryApi;
use ql_04_consensus::VoteSolicitor;
use ql_05_peer_sync::PeerNetwork;
use shared_types::{Block, NodeId, VotePhase};

/// The vote source picked by `consensus.simulate_peer_votes`.
pub enum VoteSolicitation<R: RegistryApi, N: PeerNetwork> {
    Simulated(SimulatedSolicitor<R>),
    Network(NetworkSolicitor<N>),
}

#[async_trait]
impl<R: RegistryApi, N: PeerNetwork> VoteSolicitor for VoteSolicitation<R, N> {
    async fn request_vote(
        &self,
        peer: &NodeId,
        block: &Block,
        phase: VotePhase,
    ) -> Result<bool, String> {
        match self {
            VoteSolicitation::Simulated(inner) => inner.request_vote(peer, block, phase).await,
            VoteSolicitation::Network(inner) => inner.request_vote(peer, block, phase).await,
        }
    }
}
