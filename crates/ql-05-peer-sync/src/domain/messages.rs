//! Peer wire messages.
//!
//! Every message is a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "SEND_BLOCK", "sender": "N2", "block": { ... }}
//! {"type": "GET_CHAIN"}
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{Block, NodeId, PublicKey, Vote, VotePhase};
use std::collections::BTreeSet;

/// What a node announces about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeInfo {
    pub id: NodeId,
    /// Network address, `host:port`.
    pub location: String,
    #[serde(default)]
    pub quorum_slice: BTreeSet<NodeId>,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
}

/// Requests exchanged between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    /// A block for the recipient's `OnPeerBlock`.
    SendBlock { sender: NodeId, block: Block },
    /// A vote for the recipient's `OnPeerVote`.
    SendVote { vote: Vote },
    /// Ask the recipient to vote `phase` on `block`.
    RequestVote {
        sender: NodeId,
        block: Block,
        phase: VotePhase,
    },
    /// Register or refresh the sender.
    NodePing { node: NodeInfo },
    /// Peers the recipient has seen within its liveness window.
    ActiveNodes,
    /// The recipient's full chain.
    GetChain,
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::SendBlock { .. } => "SEND_BLOCK",
            PeerMessage::SendVote { .. } => "SEND_VOTE",
            PeerMessage::RequestVote { .. } => "REQUEST_VOTE",
            PeerMessage::NodePing { .. } => "NODE_PING",
            PeerMessage::ActiveNodes => "ACTIVE_NODES",
            PeerMessage::GetChain => "GET_CHAIN",
        }
    }
}

/// Replies to [`PeerMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerReply {
    Ack,
    Rejected { reason: String },
    VoteCast { vote: Vote },
    VoteRefused { reason: String },
    Nodes { nodes: Vec<NodeInfo> },
    Chain { blocks: Vec<Block> },
}

impl PeerReply {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerReply::Ack => "ACK",
            PeerReply::Rejected { .. } => "REJECTED",
            PeerReply::VoteCast { .. } => "VOTE_CAST",
            PeerReply::VoteRefused { .. } => "VOTE_REFUSED",
            PeerReply::Nodes { .. } => "NODES",
            PeerReply::Chain { .. } => "CHAIN",
        }
    }
}
