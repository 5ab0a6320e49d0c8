//! # HTTP peer transport
//!
//! Every peer message is one `POST http://{location}/p2p` with the JSON
//! encoding of [`PeerMessage`]; the response body is a [`PeerReply`].
//! Peer locations come from the validator registry.

use async_trait::async_trait;
use ql_03_validator_registry::RegistryApi;
use ql_04_consensus::VoteSolicitor;
use ql_05_peer_sync::{PeerMessage, PeerNetwork, PeerReply, SyncError, SyncResult};
use ql_telemetry::metrics::PEER_SEND_FAILURES;
use shared_types::{Block, NodeId, VotePhase};
use std::sync::Arc;
use std::time::Duration;

/// Path every node serves peer messages on.
pub const P2P_PATH: &str = "/p2p";

/// `PeerNetwork` over HTTP/JSON.
pub struct HttpPeerNetwork<R: RegistryApi> {
    client: reqwest::Client,
    registry: Arc<R>,
}

impl<R: RegistryApi> HttpPeerNetwork<R> {
    pub fn new(registry: Arc<R>, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, registry })
    }

    fn endpoint(&self, peer: &NodeId) -> SyncResult<String> {
        let node = self
            .registry
            .get(peer)
            .ok_or_else(|| SyncError::unreachable(peer, "no known location"))?;
        Ok(format!("http://{}{}", node.location, P2P_PATH))
    }

    async fn post(&self, peer: &NodeId, message: &PeerMessage) -> SyncResult<PeerReply> {
        let url = self.endpoint(peer)?;
        let response = self
            .client
            .post(&url)
            .json(message)
            .send()
            .await
            .map_err(|e| SyncError::unreachable(peer, e))?
            .error_for_status()
            .map_err(|e| SyncError::unreachable(peer, e))?;
        response
            .json::<PeerReply>()
            .await
            .map_err(|e| SyncError::UnexpectedReply {
                peer: peer.clone(),
                reply: e.to_string(),
            })
    }
}

#[async_trait]
impl<R: RegistryApi> PeerNetwork for HttpPeerNetwork<R> {
    async fn send(&self, peer: &NodeId, message: &PeerMessage) -> SyncResult<PeerReply> {
        let result = self.post(peer, message).await;
        if let Err(e) = &result {
            PEER_SEND_FAILURES.inc();
            tracing::debug!("[runtime] {} to {} failed: {}", message.kind(), peer, e);
        }
        result
    }
}

/// Asks real peers for votes with `REQUEST_VOTE`.
pub struct NetworkSolicitor<N: PeerNetwork> {
    network: Arc<N>,
    local_id: NodeId,
}

impl<N: PeerNetwork> NetworkSolicitor<N> {
    pub fn new(network: Arc<N>, local_id: NodeId) -> Self {
        Self { network, local_id }
    }
}

#[async_trait]
impl<N: PeerNetwork> VoteSolicitor for NetworkSolicitor<N> {
    async fn request_vote(
        &self,
        peer: &NodeId,
        block: &Block,
        phase: VotePhase,
    ) -> Result<bool, String> {
        let message = PeerMessage::RequestVote {
            sender: self.local_id.clone(),
            block: block.clone(),
            phase,
        };
        match self.network.send(peer, &message).await {
            Ok(PeerReply::VoteCast { vote }) => {
                if vote.voter != *peer || vote.block_hash != block.hash || vote.phase != phase {
                    return Err(format!("{peer} answered with a vote for something else"));
                }
                Ok(true)
            }
            Ok(PeerReply::VoteRefused { reason }) => {
                tracing::debug!("[runtime] {} refused {} on #{}: {}", peer, phase, block.index, reason);
                Ok(false)
            }
            Ok(other) => Err(format!("unexpected {} reply from {peer}", other.kind())),
            Err(e) => Err(e.to_string()),
        }
    }
}
