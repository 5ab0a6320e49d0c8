//! Read-only queries for explorers and dashboards, plus transaction intake.

use crate::container::NodeContainer;
use ql_01_ledger_store::LedgerApi;
use ql_02_mempool::{MempoolApi, MempoolError};
use ql_03_validator_registry::{RegistryApi, ValidatorStats};
use ql_04_consensus::ConsensusApi;
use serde::{Deserialize, Serialize};
use shared_types::{Block, Hash, NodeId, Transaction};

/// Summary served at `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub id: NodeId,
    pub height: u64,
    pub tip: Hash,
    pub mempool: usize,
    pub pending_proposals: usize,
    pub proposer: Option<NodeId>,
}

/// Answer to `POST /transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub hash: Hash,
}

pub fn chain(node: &NodeContainer) -> Vec<Block> {
    node.ledger.chain()
}

pub fn block(node: &NodeContainer, index: u64) -> Option<Block> {
    node.ledger.get_block(index)
}

pub fn validator_stats(node: &NodeContainer) -> Vec<ValidatorStats> {
    node.registry.stats()
}

pub fn status(node: &NodeContainer) -> NodeStatus {
    let tip = node.ledger.tip();
    NodeStatus {
        id: node.local_id().clone(),
        height: tip.index,
        tip: tip.hash,
        mempool: node.mempool.len(),
        pending_proposals: node.consensus.pending_retries(),
        proposer: node.registry.select_proposer(),
    }
}

pub fn submit(node: &NodeContainer, tx: Transaction) -> Result<SubmitReceipt, MempoolError> {
    node.submit_transaction(tx).map(|hash| SubmitReceipt { hash })
}
