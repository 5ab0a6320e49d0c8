//! Validator records and registry configuration.

use super::reputation::ReputationPolicy;
use serde::{Deserialize, Serialize};
use shared_types::{NodeId, PublicKey, Timestamp};
use std::collections::BTreeSet;

/// One validator as this node sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorNode {
    pub id: NodeId,
    /// Transport address, e.g. `"10.0.0.2:7000"`.
    pub location: String,
    pub quorum_slice: BTreeSet<NodeId>,
    pub trust_score: f64,
    pub uptime_score: f64,
    pub last_seen: Timestamp,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
    #[serde(default)]
    pub blocks_proposed: u64,
}

impl ValidatorNode {
    /// `trust * uptime`, the proposer-selection weight.
    pub fn reputation(&self) -> f64 {
        self.trust_score * self.uptime_score
    }

    /// Seen within `window` seconds of `now`.
    pub fn is_live(&self, now: Timestamp, window: u64) -> bool {
        now.saturating_sub(self.last_seen) <= window
    }
}

/// Registration request, as carried by config seeding and `NODE_PING`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistration {
    pub id: NodeId,
    pub location: String,
    #[serde(default)]
    pub quorum_slice: BTreeSet<NodeId>,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
}

impl NodeRegistration {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            location: location.into(),
            quorum_slice: BTreeSet::new(),
            public_key: None,
        }
    }

    pub fn with_slice<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quorum_slice = members.into_iter().map(NodeId::new).collect();
        self
    }

    pub fn with_public_key(mut self, key: PublicKey) -> Self {
        self.public_key = Some(key);
        self
    }
}

/// Read-only view served to explorers and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStats {
    pub id: NodeId,
    pub location: String,
    pub trust_score: f64,
    pub uptime_score: f64,
    pub reputation: f64,
    pub last_seen: Timestamp,
    pub active: bool,
    pub blocks_proposed: u64,
    pub quorum_slice_size: usize,
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Seconds since `last_seen` after which a node is not live.
    pub liveness_window_secs: u64,
    pub initial_trust: f64,
    pub initial_uptime: f64,
    pub policy: ReputationPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            liveness_window_secs: 120,
            initial_trust: 1.0,
            initial_uptime: 1.0,
            policy: ReputationPolicy::default(),
        }
    }
}
