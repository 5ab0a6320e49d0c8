//! # Peer discovery
//!
//! Every round, each known peer gets a `NODE_PING` with our own info and an
//! `ACTIVE_NODES` query. Nodes we have never heard of are registered with
//! default scores; known ones are left alone.
//!
//! At startup the node also catches up from the first bootstrap peer that
//! serves a longer valid chain.

use crate::container::NodeContainer;
use futures::future::join_all;
use ql_03_validator_registry::{NodeRegistration, RegistryApi};
use ql_05_peer_sync::{
    NodeInfo, PeerDirectory, PeerEvent, PeerMessage, PeerReply, PeerSyncApi, SyncError,
    SyncResult,
};
use ql_telemetry::metrics::ACTIVE_VALIDATORS;
use shared_types::NodeId;
use std::sync::Arc;
use tokio::sync::watch;

/// What one round found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub reached: usize,
    pub unreachable: usize,
    /// Nodes registered for the first time.
    pub learned: Vec<NodeId>,
}

pub struct Discovery {
    node: Arc<NodeContainer>,
}

impl Discovery {
    pub fn new(node: Arc<NodeContainer>) -> Self {
        Self { node }
    }

    /// Adopt the chain of the first bootstrap peer that has a longer one.
    pub async fn catch_up_from_bootstrap(&self) -> Option<NodeId> {
        let peers = match self.node.config.bootstrap_peers() {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!("[runtime] ⚠️ Bad bootstrap peer list: {}", e);
                return None;
            }
        };
        for peer in peers {
            match self.node.sync.catch_up(&peer.id).await {
                Ok(outcome) if outcome.adopted => return Some(peer.id),
                Ok(_) => {}
                Err(e) => tracing::warn!("[runtime] 📵 Catch-up from {} failed: {}", peer.id, e),
            }
        }
        None
    }

    pub async fn round(&self) -> DiscoveryReport {
        let peers = self.node.directory.peers();
        let ping = PeerMessage::NodePing {
            node: self.node.local_info(),
        };
        let visits = peers.iter().map(|peer| {
            let ping = &ping;
            async move { (peer, self.visit(peer, ping).await) }
        });

        let mut report = DiscoveryReport::default();
        for (peer, result) in join_all(visits).await {
            match result {
                Ok(nodes) => {
                    report.reached += 1;
                    self.node.directory.mark_online(peer);
                    report.learned.extend(self.merge(nodes));
                }
                Err(e) => {
                    report.unreachable += 1;
                    self.node.directory.record(peer, PeerEvent::Unreachable);
                    tracing::debug!("[runtime] Discovery could not reach {}: {}", peer, e);
                }
            }
        }

        ACTIVE_VALIDATORS.set(self.node.registry.active_nodes().len() as f64);
        if !report.learned.is_empty() {
            tracing::info!(
                "[runtime] 🔭 Discovered {} new peers: {:?}",
                report.learned.len(),
                report.learned
            );
        }
        report
    }

    async fn visit(&self, peer: &NodeId, ping: &PeerMessage) -> SyncResult<Vec<NodeInfo>> {
        self.node.sync.request(peer, ping).await?;
        match self.node.sync.request(peer, &PeerMessage::ActiveNodes).await? {
            PeerReply::Nodes { nodes } => Ok(nodes),
            other => Err(SyncError::UnexpectedReply {
                peer: peer.clone(),
                reply: other.kind().to_string(),
            }),
        }
    }

    fn merge(&self, nodes: Vec<NodeInfo>) -> Vec<NodeId> {
        let local = self.node.local_id();
        let mut learned = Vec::new();
        for info in nodes {
            if info.id == *local || self.node.registry.get(&info.id).is_some() {
                continue;
            }
            let registration = NodeRegistration {
                id: info.id.clone(),
                location: info.location,
                quorum_slice: info.quorum_slice,
                public_key: info.public_key,
            };
            match self.node.registry.register(registration) {
                Ok(_) => learned.push(info.id),
                Err(e) => tracing::debug!("[runtime] Ignoring advertised node {}: {}", info.id, e),
            }
        }
        learned
    }

    /// Run rounds every `discovery.interval` until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("[runtime] 🔭 Discovery started");
        if let Some(peer) = self.catch_up_from_bootstrap().await {
            tracing::info!("[runtime] ⏩ Bootstrapped chain from {}", peer);
        }
        let interval = self.node.config.discovery.interval;
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.round().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("[runtime] Discovery stopped");
    }
}
