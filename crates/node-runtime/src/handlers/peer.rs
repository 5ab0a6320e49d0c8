//! `PeerMessage` → `PeerReply`.
//!
//! | Message | Handled by |
//! |---------|------------|
//! | `SEND_BLOCK` | `NodeContainer::on_peer_block` |
//! | `SEND_VOTE` | `NodeContainer::on_peer_vote` |
//! | `REQUEST_VOTE` | `ConsensusApi::answer_vote_request` |
//! | `NODE_PING` | `RegistryApi::register` |
//! | `ACTIVE_NODES` | `RegistryApi::active_nodes` |
//! | `GET_CHAIN` | `LedgerApi::chain` |

use crate::container::NodeContainer;
use ql_01_ledger_store::LedgerApi;
use ql_03_validator_registry::{NodeRegistration, RegistryApi};
use ql_04_consensus::ConsensusApi;
use ql_05_peer_sync::{NodeInfo, PeerMessage, PeerReply};

pub async fn dispatch(node: &NodeContainer, message: PeerMessage) -> PeerReply {
    tracing::trace!("[runtime] ⬅️ {}", message.kind());
    match message {
        PeerMessage::SendBlock { sender, block } => {
            match node.on_peer_block(block, Some(sender)).await {
                Ok(_) => PeerReply::Ack,
                Err(e) => PeerReply::Rejected {
                    reason: e.to_string(),
                },
            }
        }
        PeerMessage::SendVote { vote } => match node.on_peer_vote(vote).await {
            Ok(_) => PeerReply::Ack,
            Err(e) => PeerReply::Rejected {
                reason: e.to_string(),
            },
        },
        PeerMessage::RequestVote {
            sender,
            block,
            phase,
        } => {
            if node.registry.get(&sender).is_none() {
                return PeerReply::VoteRefused {
                    reason: format!("{sender} is not a registered validator"),
                };
            }
            match node.consensus.answer_vote_request(&block, phase) {
                Ok(vote) => PeerReply::VoteCast { vote },
                Err(e) => PeerReply::VoteRefused {
                    reason: e.to_string(),
                },
            }
        }
        PeerMessage::NodePing { node: info } => register_ping(node, info),
        PeerMessage::ActiveNodes => PeerReply::Nodes {
            nodes: node
                .registry
                .active_nodes()
                .into_iter()
                .map(|v| NodeInfo {
                    id: v.id,
                    location: v.location,
                    quorum_slice: v.quorum_slice,
                    public_key: v.public_key,
                })
                .collect(),
        },
        PeerMessage::GetChain => PeerReply::Chain {
            blocks: node.ledger.chain(),
        },
    }
}

/// A ping may not replace a public key we already hold for that id.
fn register_ping(node: &NodeContainer, info: NodeInfo) -> PeerReply {
    if info.id == *node.local_id() {
        return PeerReply::Rejected {
            reason: "ping carries our own id".to_string(),
        };
    }
    if let (Some(known), Some(claimed)) = (node.registry.public_key(&info.id), info.public_key) {
        if known != claimed {
            tracing::warn!("[runtime] 🚨 {} pinged with a different public key", info.id);
            return PeerReply::Rejected {
                reason: "public key does not match registration".to_string(),
            };
        }
    }
    let registration = NodeRegistration {
        id: info.id,
        location: info.location,
        quorum_slice: info.quorum_slice,
        public_key: info.public_key,
    };
    match node.registry.register(registration) {
        Ok(_) => PeerReply::Ack,
        Err(e) => PeerReply::Rejected {
            reason: e.to_string(),
        },
    }
}
