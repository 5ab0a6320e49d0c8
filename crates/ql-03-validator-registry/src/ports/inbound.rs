//! Driving ports (Inbound API)

use crate::domain::{NodeRegistration, RegistryResult, ValidatorNode, ValidatorStats};
use shared_types::{NodeId, PublicKey};
use std::collections::BTreeSet;

/// Validator registry API.
///
/// All mutations are serialized by the implementation. Callers must not hold
/// this lock across network I/O; every method returns owned data.
pub trait RegistryApi: Send + Sync {
    /// Create the node, or refresh location/key/slice and `last_seen` if known.
    ///
    /// Returns `true` if the node was newly created.
    fn register(&self, registration: NodeRegistration) -> RegistryResult<bool>;

    fn get(&self, id: &NodeId) -> Option<ValidatorNode>;

    /// Apply the trust EMA. Returns the new score.
    fn update_trust(&self, id: &NodeId, success: bool) -> RegistryResult<f64>;

    /// Apply the uptime EMA. Returns the new score.
    fn update_uptime(&self, id: &NodeId, online: bool) -> RegistryResult<f64>;

    /// Mark the node as seen now.
    fn touch(&self, id: &NodeId) -> RegistryResult<()>;

    /// Replace a node's quorum slice.
    fn set_quorum_slice(&self, id: &NodeId, slice: BTreeSet<NodeId>) -> RegistryResult<()>;

    /// Count a finalized proposal for `id`.
    fn record_proposal(&self, id: &NodeId) -> RegistryResult<()>;

    /// Deterministic proposer among live nodes.
    fn select_proposer(&self) -> Option<NodeId>;

    /// Nodes seen within the liveness window.
    fn active_nodes(&self) -> Vec<ValidatorNode>;

    /// Every known node.
    fn all(&self) -> Vec<ValidatorNode>;

    fn public_key(&self, id: &NodeId) -> Option<PublicKey>;

    fn stats(&self) -> Vec<ValidatorStats>;
}
