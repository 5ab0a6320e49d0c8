//! # Registry-backed directory adapter
//!
//! The validator registry answers every "who is this peer" question the
//! subsystems ask:
//!
//! | Port | Subsystem | Backed by |
//! |------|-----------|-----------|
//! | `KeyDirectory` | ledger store | `public_key` |
//! | `SenderDirectory` | mempool | registered validators + configured accounts |
//! | `QuorumSliceProvider` | consensus | local node's `quorum_slice` |
//! | `ReputationSink` | consensus | trust/uptime EMA |
//! | `PeerDirectory` | peer sync | all known nodes, trust/uptime EMA |

use ql_01_ledger_store::KeyDirectory;
use ql_02_mempool::SenderDirectory;
use ql_03_validator_registry::{RegistryApi, RegistryResult};
use ql_04_consensus::{Participation, QuorumSliceProvider, ReputationSink};
use ql_05_peer_sync::{PeerDirectory, PeerEvent};
use shared_types::{NodeId, PublicKey};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Adapter from the validator registry to the subsystem ports.
pub struct RegistryDirectory<R: RegistryApi> {
    registry: Arc<R>,
    local_id: NodeId,
    accounts: BTreeSet<NodeId>,
}

impl<R: RegistryApi> RegistryDirectory<R> {
    pub fn new(registry: Arc<R>, local_id: NodeId, accounts: BTreeSet<NodeId>) -> Self {
        Self {
            registry,
            local_id,
            accounts,
        }
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// The peer answered something: refresh `last_seen` and count it online.
    pub fn mark_online(&self, peer: &NodeId) {
        self.score(peer, None, Some(true));
    }

    fn score(&self, peer: &NodeId, trust: Option<bool>, online: Option<bool>) {
        if *peer == self.local_id {
            return;
        }
        if let Err(e) = self.apply(peer, trust, online) {
            tracing::debug!("[runtime] Reputation update for {} skipped: {}", peer, e);
        }
    }

    fn apply(&self, peer: &NodeId, trust: Option<bool>, online: Option<bool>) -> RegistryResult<()> {
        if let Some(success) = trust {
            self.registry.update_trust(peer, success)?;
        }
        if let Some(online) = online {
            self.registry.update_uptime(peer, online)?;
            if online {
                self.registry.touch(peer)?;
            }
        }
        Ok(())
    }
}

impl<R: RegistryApi> KeyDirectory for RegistryDirectory<R> {
    fn public_key(&self, id: &NodeId) -> Option<PublicKey> {
        self.registry.public_key(id)
    }
}

impl<R: RegistryApi> SenderDirectory for RegistryDirectory<R> {
    fn is_known(&self, id: &NodeId) -> bool {
        self.accounts.contains(id) || self.registry.get(id).is_some()
    }
}

impl<R: RegistryApi> QuorumSliceProvider for RegistryDirectory<R> {
    fn quorum_slice(&self) -> BTreeSet<NodeId> {
        let mut slice = self
            .registry
            .get(&self.local_id)
            .map(|node| node.quorum_slice)
            .unwrap_or_default();
        slice.insert(self.local_id.clone());
        slice
    }
}

impl<R: RegistryApi> ReputationSink for RegistryDirectory<R> {
    fn record(&self, peer: &NodeId, outcome: Participation) {
        match outcome {
            Participation::Voted => self.score(peer, Some(true), Some(true)),
            Participation::Declined => self.score(peer, Some(false), None),
            Participation::Unreachable => self.score(peer, Some(false), Some(false)),
        }
    }
}

impl<R: RegistryApi> PeerDirectory for RegistryDirectory<R> {
    fn peers(&self) -> Vec<NodeId> {
        self.registry
            .all()
            .into_iter()
            .map(|node| node.id)
            .filter(|id| *id != self.local_id)
            .collect()
    }

    fn record(&self, peer: &NodeId, event: PeerEvent) {
        match event {
            PeerEvent::BlockAccepted => self.score(peer, Some(true), Some(true)),
            PeerEvent::BlockRejected => self.score(peer, Some(false), None),
            PeerEvent::DuplicateBlock => self.score(peer, None, Some(true)),
            PeerEvent::Unreachable => self.score(peer, Some(false), Some(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_03_validator_registry::{
        InMemoryRegistryStore, NodeRegistration, RegistryConfig, SystemTimeSource,
        ValidatorRegistry,
    };

    type TestRegistry = ValidatorRegistry<InMemoryRegistryStore, SystemTimeSource>;

    fn make_directory() -> RegistryDirectory<TestRegistry> {
        let registry = ValidatorRegistry::open(
            Arc::new(InMemoryRegistryStore::new()),
            Arc::new(SystemTimeSource),
            RegistryConfig::default(),
        )
        .unwrap();
        registry
            .register(NodeRegistration::new("N1", "127.0.0.1:7001").with_slice(["N2", "N3"]))
            .unwrap();
        registry
            .register(NodeRegistration::new("N2", "127.0.0.1:7002"))
            .unwrap();
        let accounts = [NodeId::new("alice")].into_iter().collect();
        RegistryDirectory::new(Arc::new(registry), NodeId::new("N1"), accounts)
    }

    #[test]
    fn test_slice_always_contains_local_node() {
        let directory = make_directory();
        let slice = directory.quorum_slice();
        assert_eq!(slice.len(), 3);
        assert!(slice.contains(&NodeId::new("N1")));
    }

    #[test]
    fn test_senders_are_validators_or_accounts() {
        let directory = make_directory();
        assert!(directory.is_known(&NodeId::new("alice")));
        assert!(directory.is_known(&NodeId::new("N2")));
        assert!(!directory.is_known(&NodeId::new("mallory")));
    }

    #[test]
    fn test_peers_exclude_local_node() {
        let directory = make_directory();
        assert_eq!(directory.peers(), vec![NodeId::new("N2")]);
    }

    #[test]
    fn test_unreachable_peer_loses_trust_and_uptime() {
        let directory = make_directory();
        let n2 = NodeId::new("N2");
        ReputationSink::record(&directory, &n2, Participation::Unreachable);

        let node = directory.registry().get(&n2).unwrap();
        assert!((node.trust_score - 0.9).abs() < 1e-9);
        assert!((node.uptime_score - 0.995).abs() < 1e-9);
    }

    #[test]
    fn test_declined_vote_costs_trust_only() {
        let directory = make_directory();
        let n2 = NodeId::new("N2");
        ReputationSink::record(&directory, &n2, Participation::Declined);

        let node = directory.registry().get(&n2).unwrap();
        assert!(node.trust_score < 1.0);
        assert_eq!(node.uptime_score, 1.0);
    }

    #[test]
    fn test_unknown_peer_is_ignored() {
        let directory = make_directory();
        PeerDirectory::record(&directory, &NodeId::new("ghost"), PeerEvent::BlockRejected);
        assert!(directory.registry().get(&NodeId::new("ghost")).is_none());
    }
}
