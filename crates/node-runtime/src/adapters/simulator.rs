//! # Vote simulator
//!
//! Answers vote requests locally from registry scores, for deployments where
//! peers do not run a voting endpoint:
//!
//! - the peer is reachable with probability `uptime`
//! - a reachable peer approves with probability `trust * 0.9 + 0.1`

use async_trait::async_trait;
use parking_lot::Mutex;
use ql_03_validator_registry::RegistryApi;
use ql_04_consensus::VoteSolicitor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{Block, NodeId, VotePhase};
use std::sync::Arc;

/// Approval probability for a reachable peer with `trust`.
pub fn approval_probability(trust: f64) -> f64 {
    (trust * 0.9 + 0.1).clamp(0.0, 1.0)
}

pub struct SimulatedSolicitor<R: RegistryApi> {
    registry: Arc<R>,
    rng: Mutex<StdRng>,
}

impl<R: RegistryApi> SimulatedSolicitor<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic outcomes, for tests.
    pub fn with_seed(registry: Arc<R>, seed: u64) -> Self {
        Self {
            registry,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl<R: RegistryApi> VoteSolicitor for SimulatedSolicitor<R> {
    async fn request_vote(
        &self,
        peer: &NodeId,
        _block: &Block,
        phase: VotePhase,
    ) -> Result<bool, String> {
        let node = self
            .registry
            .get(peer)
            .ok_or_else(|| format!("{peer} is not registered"))?;
        let (reachable, approves) = {
            let mut rng = self.rng.lock();
            (
                rng.gen::<f64>() < node.uptime_score,
                rng.gen::<f64>() < approval_probability(node.trust_score),
            )
        };
        if !reachable {
            return Err(format!("{peer} did not answer {phase}"));
        }
        Ok(approves)
    }
}
