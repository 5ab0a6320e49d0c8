//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the ledger store needs from its host.

use crate::domain::{LedgerResult, RepairReport};
use shared_types::{Block, NodeId, PublicKey};

/// A chain read back from durable storage.
#[derive(Debug, Clone)]
pub struct LoadedChain {
    pub blocks: Vec<Block>,
    /// Present if the stored document needed syntactic repair to parse.
    pub repair: Option<RepairReport>,
}

/// Durable storage for the whole chain.
///
/// `save` must be atomic: after a crash, `load` returns either the previous
/// chain or the new one, never a mixture.
pub trait ChainPersistence: Send + Sync {
    /// Read the stored chain. `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> LedgerResult<Option<LoadedChain>>;

    /// Replace the stored chain with `chain`.
    fn save(&self, chain: &[Block]) -> LedgerResult<()>;
}

/// Lookup of proposer public keys, backed by the validator registry.
pub trait KeyDirectory: Send + Sync {
    fn public_key(&self, id: &NodeId) -> Option<PublicKey>;
}
