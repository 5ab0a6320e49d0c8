//! Validator registry service.

use crate::domain::reputation::clamp_score;
use crate::domain::{
    select_proposer, NodeRegistration, RegistryConfig, RegistryError, RegistryResult,
    ValidatorNode, ValidatorStats,
};
use crate::ports::{RegistryApi, RegistryPersistence, TimeSource};
use parking_lot::RwLock;
use shared_types::{NodeId, PublicKey};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Registry of validators keyed by id.
pub struct ValidatorRegistry<P, T>
where
    P: RegistryPersistence,
    T: TimeSource,
{
    persistence: Arc<P>,
    time: Arc<T>,
    config: RegistryConfig,
    nodes: RwLock<BTreeMap<NodeId, ValidatorNode>>,
}

impl<P, T> ValidatorRegistry<P, T>
where
    P: RegistryPersistence,
    T: TimeSource,
{
    /// Load persisted validators.
    pub fn open(persistence: Arc<P>, time: Arc<T>, config: RegistryConfig) -> RegistryResult<Self> {
        let loaded = persistence.load()?;
        let nodes = loaded
            .into_iter()
            .map(|mut node| {
                node.trust_score = clamp_score(node.trust_score);
                node.uptime_score = clamp_score(node.uptime_score);
                (node.id.clone(), node)
            })
            .collect::<BTreeMap<_, _>>();
        tracing::info!("[ql-03] 👥 Registry opened with {} validators", nodes.len());
        Ok(Self {
            persistence,
            time,
            config,
            nodes: RwLock::new(nodes),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Persist a snapshot. Failures are logged; in-memory state stays authoritative.
    fn persist(&self, nodes: &BTreeMap<NodeId, ValidatorNode>) {
        let snapshot: Vec<ValidatorNode> = nodes.values().cloned().collect();
        if let Err(e) = self.persistence.save(&snapshot) {
            tracing::warn!("[ql-03] ⚠️ Failed to persist registry: {}", e);
        }
    }

    fn mutate<R>(
        &self,
        id: &NodeId,
        f: impl FnOnce(&mut ValidatorNode) -> R,
    ) -> RegistryResult<R> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownValidator(id.clone()))?;
        let result = f(node);
        self.persist(&nodes);
        Ok(result)
    }
}

impl<P, T> RegistryApi for ValidatorRegistry<P, T>
where
    P: RegistryPersistence,
    T: TimeSource,
{
    fn register(&self, registration: NodeRegistration) -> RegistryResult<bool> {
        if registration.id.as_str().trim().is_empty() {
            return Err(RegistryError::InvalidRegistration {
                id: registration.id,
                reason: "empty id".to_string(),
            });
        }
        let now = self.time.now();
        let mut nodes = self.nodes.write();

        let created = match nodes.get_mut(&registration.id) {
            Some(node) => {
                node.location = registration.location;
                node.last_seen = now;
                if registration.public_key.is_some() {
                    node.public_key = registration.public_key;
                }
                if !registration.quorum_slice.is_empty() {
                    node.quorum_slice = registration.quorum_slice;
                }
                false
            }
            None => {
                tracing::info!(
                    "[ql-03] ➕ Registered validator {} at {}",
                    registration.id,
                    registration.location
                );
                nodes.insert(
                    registration.id.clone(),
                    ValidatorNode {
                        id: registration.id,
                        location: registration.location,
                        quorum_slice: registration.quorum_slice,
                        trust_score: clamp_score(self.config.initial_trust),
                        uptime_score: clamp_score(self.config.initial_uptime),
                        last_seen: now,
                        public_key: registration.public_key,
                        blocks_proposed: 0,
                    },
                );
                true
            }
        };

        self.persist(&nodes);
        Ok(created)
    }

    fn get(&self, id: &NodeId) -> Option<ValidatorNode> {
        self.nodes.read().get(id).cloned()
    }

    fn update_trust(&self, id: &NodeId, success: bool) -> RegistryResult<f64> {
        let policy = self.config.policy;
        self.mutate(id, |node| {
            node.trust_score = policy.next_trust(node.trust_score, success);
            tracing::debug!(
                "[ql-03] 🎯 Trust of {} → {:.3} ({})",
                node.id,
                node.trust_score,
                if success { "success" } else { "failure" }
            );
            node.trust_score
        })
    }

    fn update_uptime(&self, id: &NodeId, online: bool) -> RegistryResult<f64> {
        let policy = self.config.policy;
        self.mutate(id, |node| {
            node.uptime_score = policy.next_uptime(node.uptime_score, online);
            node.uptime_score
        })
    }

    fn touch(&self, id: &NodeId) -> RegistryResult<()> {
        let now = self.time.now();
        self.mutate(id, |node| node.last_seen = now)
    }

    fn set_quorum_slice(&self, id: &NodeId, slice: BTreeSet<NodeId>) -> RegistryResult<()> {
        self.mutate(id, |node| node.quorum_slice = slice)
    }

    fn record_proposal(&self, id: &NodeId) -> RegistryResult<()> {
        self.mutate(id, |node| node.blocks_proposed += 1)
    }

    fn select_proposer(&self) -> Option<NodeId> {
        let now = self.time.now();
        select_proposer(
            self.nodes.read().values(),
            now,
            self.config.liveness_window_secs,
        )
    }

    fn active_nodes(&self) -> Vec<ValidatorNode> {
        let now = self.time.now();
        let window = self.config.liveness_window_secs;
        self.nodes
            .read()
            .values()
            .filter(|n| n.is_live(now, window))
            .cloned()
            .collect()
    }

    fn all(&self) -> Vec<ValidatorNode> {
        self.nodes.read().values().cloned().collect()
    }

    fn public_key(&self, id: &NodeId) -> Option<PublicKey> {
        self.nodes.read().get(id).and_then(|n| n.public_key)
    }

    fn stats(&self) -> Vec<ValidatorStats> {
        let now = self.time.now();
        let window = self.config.liveness_window_secs;
        self.nodes
            .read()
            .values()
            .map(|n| ValidatorStats {
                id: n.id.clone(),
                location: n.location.clone(),
                trust_score: n.trust_score,
                uptime_score: n.uptime_score,
                reputation: n.reputation(),
                last_seen: n.last_seen,
                active: n.is_live(now, window),
                blocks_proposed: n.blocks_proposed,
                quorum_slice_size: n.quorum_slice.len(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryRegistryStore, JsonFileRegistryStore};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn set(&self, t: u64) {
            self.0.store(t, Ordering::SeqCst);
        }
    }

    impl TimeSource for ManualClock {
        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn make_test_registry() -> (
        ValidatorRegistry<InMemoryRegistryStore, ManualClock>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::default());
        clock.set(1_000);
        let registry = ValidatorRegistry::open(
            Arc::new(InMemoryRegistryStore::new()),
            clock.clone(),
            RegistryConfig {
                liveness_window_secs: 60,
                ..RegistryConfig::default()
            },
        )
        .unwrap();
        (registry, clock)
    }

    #[test]
    fn test_register_then_refresh() {
        let (registry, clock) = make_test_registry();
        let created = registry
            .register(NodeRegistration::new("N1", "a:1").with_slice(["N2", "N3"]))
            .unwrap();
        assert!(created);

        clock.set(1_030);
        let created = registry
            .register(NodeRegistration::new("N1", "b:2"))
            .unwrap();
        assert!(!created);

        let node = registry.get(&NodeId::from("N1")).unwrap();
        assert_eq!(node.location, "b:2");
        assert_eq!(node.last_seen, 1_030);
        assert_eq!(node.quorum_slice.len(), 2, "empty slice must not wipe the existing one");
    }

    #[test]
    fn test_empty_id_rejected() {
        let (registry, _) = make_test_registry();
        assert!(matches!(
            registry.register(NodeRegistration::new("  ", "a:1")),
            Err(RegistryError::InvalidRegistration { .. })
        ));
    }

    #[test]
    fn test_update_unknown_validator() {
        let (registry, _) = make_test_registry();
        assert_eq!(
            registry.update_trust(&NodeId::from("ghost"), true),
            Err(RegistryError::UnknownValidator(NodeId::from("ghost")))
        );
    }

    #[test]
    fn test_repeated_updates_stay_clamped() {
        let (registry, _) = make_test_registry();
        let id = NodeId::from("N1");
        registry.register(NodeRegistration::new("N1", "a:1")).unwrap();

        for _ in 0..50 {
            let t = registry.update_trust(&id, true).unwrap();
            let u = registry.update_uptime(&id, true).unwrap();
            assert!(t <= 1.0 && u <= 1.0);
        }
        for _ in 0..50 {
            let t = registry.update_trust(&id, false).unwrap();
            let u = registry.update_uptime(&id, false).unwrap();
            assert!(t >= 0.0 && u >= 0.0);
        }
        assert_eq!(registry.get(&id).unwrap().trust_score, 0.0);
    }

    #[test]
    fn test_select_proposer_respects_liveness_and_ties() {
        let (registry, clock) = make_test_registry();
        for id in ["N2", "N1", "N3"] {
            registry.register(NodeRegistration::new(id, "x:1")).unwrap();
        }
        assert_eq!(registry.select_proposer(), Some(NodeId::from("N1")));

        registry.update_trust(&NodeId::from("N1"), false).unwrap();
        assert_eq!(registry.select_proposer(), Some(NodeId::from("N2")));

        clock.set(1_100);
        registry.touch(&NodeId::from("N3")).unwrap();
        assert_eq!(registry.select_proposer(), Some(NodeId::from("N3")));
        assert_eq!(registry.active_nodes().len(), 1);
    }

    #[test]
    fn test_stats_report_activity() {
        let (registry, clock) = make_test_registry();
        registry.register(NodeRegistration::new("N1", "x:1")).unwrap();
        registry.record_proposal(&NodeId::from("N1")).unwrap();
        clock.set(2_000);

        let stats = registry.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].blocks_proposed, 1);
        assert!(!stats[0].active);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("validators.json");
        let clock = Arc::new(ManualClock::default());
        {
            let registry = ValidatorRegistry::open(
                Arc::new(JsonFileRegistryStore::new(&path)),
                clock.clone(),
                RegistryConfig::default(),
            )
            .unwrap();
            registry.register(NodeRegistration::new("N1", "x:1")).unwrap();
            registry.update_trust(&NodeId::from("N1"), false).unwrap();
        }

        let reopened = ValidatorRegistry::open(
            Arc::new(JsonFileRegistryStore::new(&path)),
            clock,
            RegistryConfig::default(),
        )
        .unwrap();
        let node = reopened.get(&NodeId::from("N1")).unwrap();
        assert!((node.trust_score - 0.9).abs() < 1e-12);
    }
}
