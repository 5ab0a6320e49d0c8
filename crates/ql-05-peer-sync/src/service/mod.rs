//! Peer sync service.

use crate::domain::{
    catch_up_refusal, splice_fork, PeerMessage, PeerReply, ReceiveOutcome, SyncError, SyncResult,
};
use crate::ports::{
    BroadcastReport, CatchUpOutcome, ChainObserver, PeerDirectory, PeerEvent, PeerNetwork,
    PeerSyncApi,
};
use async_trait::async_trait;
use ql_01_ledger_store::{LedgerApi, LedgerError};
use shared_types::{Block, NodeId};
use std::sync::Arc;
use std::time::Duration;


/// Peer sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Our own id; never sent to, and stamped as `sender` on relays.
    pub local_id: NodeId,
    /// Bound on every outbound request.
    pub request_timeout: Duration,
}

impl SyncConfig {
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: NodeId::new(local_id),
            request_timeout: Duration::from_secs(3),
        }
    }
}

/// Receives, validates and relays blocks between peers.
pub struct PeerSync<L, N, D, O>
where
    L: LedgerApi,
    N: PeerNetwork,
    D: PeerDirectory,
    O: ChainObserver,
{
    ledger: Arc<L>,
    network: Arc<N>,
    directory: Arc<D>,
    observer: Arc<O>,
    config: SyncConfig,
}

impl<L, N, D, O> PeerSync<L, N, D, O>
where
    L: LedgerApi,
    N: PeerNetwork,
    D: PeerDirectory,
    O: ChainObserver,
{
    pub fn new(
        ledger: Arc<L>,
        network: Arc<N>,
        directory: Arc<D>,
        observer: Arc<O>,
        config: SyncConfig,
    ) -> Self {
        Self {
            ledger,
            network,
            directory,
            observer,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Send one message, bounded by `request_timeout`.
    pub async fn request(&self, peer: &NodeId, message: &PeerMessage) -> SyncResult<PeerReply> {
        match tokio::time::timeout(self.config.request_timeout, self.network.send(peer, message))
            .await
        {
            Ok(reply) => reply,
            Err(_) => Err(SyncError::unreachable(
                peer,
                format!("{} timed out", message.kind()),
            )),
        }
    }

    fn record(&self, peer: Option<&NodeId>, event: PeerEvent) {
        if let Some(peer) = peer.filter(|p| **p != self.config.local_id) {
            self.directory.record(peer, event);
        }
    }

    /// Apply `block` to the ledger.
    ///
    /// A lost race against another writer is retried once with fresh state.
    fn reconcile(&self, block: &Block) -> SyncResult<ReceiveOutcome> {
        let mut retried = false;
        loop {
            if self.ledger.position_of(&block.hash).is_some() {
                return Ok(ReceiveOutcome::Duplicate);
            }

            if self.ledger.is_empty() {
                if block.index == 0 {
                    self.ledger.append(block.clone())?;
                    return Ok(ReceiveOutcome::Genesis);
                }
                return Err(LedgerError::EmptyChain.into());
            }

            let tip = self.ledger.tip();
            if block.previous_hash == tip.hash {
                match self.ledger.append(block.clone()) {
                    Ok(()) => return Ok(ReceiveOutcome::Appended),
                    Err(_) if !retried && self.ledger.tip().hash != tip.hash => {
                        retried = true;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let Some(ancestor) = self.ledger.position_of(&block.previous_hash) else {
                return Err(LedgerError::PrevHashMismatch {
                    index: block.index,
                    expected: tip.hash,
                    actual: block.previous_hash,
                }
                .into());
            };

            let (candidate, dropped) =
                splice_fork(self.ledger.chain(), ancestor as usize, block.clone());
            match self.ledger.replace_if_tip(tip.hash, candidate) {
                Ok(()) => {
                    return Ok(ReceiveOutcome::Reorganized {
                        ancestor_index: ancestor,
                        dropped,
                    })
                }
                Err(LedgerError::TipChanged { .. }) if !retried => {
                    retried = true;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl<L, N, D, O> PeerSyncApi for PeerSync<L, N, D, O>
where
    L: LedgerApi,
    N: PeerNetwork,
    D: PeerDirectory,
    O: ChainObserver,
{
    async fn receive_block(
        &self,
        block: Block,
        sender: Option<NodeId>,
    ) -> SyncResult<ReceiveOutcome> {
        let from = sender
            .as_ref()
            .map(NodeId::to_string)
            .unwrap_or_else(|| "local".to_string());

        let outcome = match self.reconcile(&block) {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(&e, SyncError::Ledger(le) if le.is_integrity_violation()) {
                    self.record(sender.as_ref(), PeerEvent::BlockRejected);
                }
                tracing::warn!(
                    "[ql-05] 🚫 Rejected block #{} ({}) from {}: {}",
                    block.index,
                    block.hash.short(),
                    from,
                    e
                );
                return Err(e);
            }
        };

        match &outcome {
            ReceiveOutcome::Duplicate => {
                tracing::debug!(
                    "[ql-05] 🔁 Duplicate block #{} ({}) from {}",
                    block.index,
                    block.hash.short(),
                    from
                );
                self.record(sender.as_ref(), PeerEvent::DuplicateBlock);
                return Ok(outcome);
            }
            ReceiveOutcome::Reorganized {
                ancestor_index,
                dropped,
            } => {
                tracing::warn!(
                    "[ql-05] 🔀 Fork resolved at #{}: dropped {} local blocks for #{} ({}) from {}",
                    ancestor_index,
                    dropped.len(),
                    block.index,
                    block.hash.short(),
                    from
                );
                self.observer.on_commit(std::slice::from_ref(&block), dropped);
            }
            ReceiveOutcome::Genesis | ReceiveOutcome::Appended => {
                tracing::info!(
                    "[ql-05] 📥 Accepted block #{} ({}) from {}",
                    block.index,
                    block.hash.short(),
                    from
                );
                self.observer.on_commit(std::slice::from_ref(&block), &[]);
            }
        }

        self.record(sender.as_ref(), PeerEvent::BlockAccepted);
        self.broadcast(&block, sender.as_ref()).await;
        Ok(outcome)
    }

    async fn broadcast(&self, block: &Block, exclude: Option<&NodeId>) -> BroadcastReport {
        let local = &self.config.local_id;
        let peers: Vec<NodeId> = self
            .directory
            .peers()
            .into_iter()
            .filter(|p| p != local && Some(p) != exclude)
            .collect();

        let message = PeerMessage::SendBlock {
            sender: local.clone(),
            block: block.clone(),
        };
        let sends = peers.into_iter().map(|peer| {
            let message = &message;
            async move {
                let result = self.request(&peer, message).await;
                (peer, result)
            }
        });

        let mut report = BroadcastReport::default();
        for (peer, result) in futures::future::join_all(sends).await {
            match result {
                Ok(reply) => {
                    if let PeerReply::Rejected { reason } = &reply {
                        tracing::debug!(
                            "[ql-05] Peer {} declined block #{}: {}",
                            peer,
                            block.index,
                            reason
                        );
                    }
                    report.delivered.push(peer);
                }
                Err(e) => {
                    tracing::warn!("[ql-05] 📵 Broadcast of #{} failed: {}", block.index, e);
                    self.directory.record(&peer, PeerEvent::Unreachable);
                    report.failed.push(peer);
                }
            }
        }

        tracing::debug!(
            "[ql-05] 📡 Block #{} relayed to {} peers ({} failed)",
            block.index,
            report.delivered.len(),
            report.failed.len()
        );
        report
    }

    async fn catch_up(&self, peer: &NodeId) -> SyncResult<CatchUpOutcome> {
        let reply = match self.request(peer, &PeerMessage::GetChain).await {
            Ok(reply) => reply,
            Err(e) => {
                self.directory.record(peer, PeerEvent::Unreachable);
                return Err(e);
            }
        };
        let PeerReply::Chain { blocks: remote } = reply else {
            return Err(SyncError::UnexpectedReply {
                peer: peer.clone(),
                reply: reply.kind().to_string(),
            });
        };

        let local = self.ledger.chain();
        if let Some(reason) = catch_up_refusal(&local, &remote) {
            tracing::debug!("[ql-05] Not adopting chain from {}: {}", peer, reason);
            return Ok(CatchUpOutcome {
                adopted: false,
                height: local.len() as u64,
            });
        }

        let shared = local
            .iter()
            .zip(&remote)
            .take_while(|(a, b)| a.hash == b.hash)
            .count();
        let height = remote.len() as u64;
        let added = remote[shared..].to_vec();

        let result = match local.last() {
            Some(tip) => self.ledger.replace_if_tip(tip.hash, remote),
            None => self.ledger.replace(remote),
        };
        match result {
            Ok(()) => {
                tracing::info!(
                    "[ql-05] ⏩ Caught up with {}: height {} → {}",
                    peer,
                    local.len(),
                    height
                );
                self.observer.on_commit(&added, &local[shared..]);
                Ok(CatchUpOutcome {
                    adopted: true,
                    height,
                })
            }
            Err(e @ LedgerError::TipChanged { .. }) => Err(e.into()),
            Err(e) => {
                self.directory.record(peer, PeerEvent::BlockRejected);
                Err(SyncError::RemoteChainRejected {
                    peer: peer.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
