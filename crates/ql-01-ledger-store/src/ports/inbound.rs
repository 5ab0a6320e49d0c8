//! # Inbound Ports (Driving Ports)
//!
//! The API the ledger store offers to consensus, peer sync and query layers.

use crate::domain::LedgerResult;
use shared_types::{Block, Hash};

/// Primary API for the ledger store.
pub trait LedgerApi: Send + Sync {
    /// Validate `block` against the tip and append it durably.
    ///
    /// ## Errors
    ///
    /// - `IndexMismatch`: `block.index != len(chain)`
    /// - `PrevHashMismatch`: `block.previous_hash != tip.hash`
    /// - `MerkleRootMismatch` / `HashInvalid`: content does not match the claimed roots
    /// - `SignatureInvalid`: proposer signature missing or not verifiable
    fn append(&self, block: Block) -> LedgerResult<()>;

    /// Run every `append` check against the current tip without appending.
    fn check_candidate(&self, block: &Block) -> LedgerResult<()>;

    /// Replay every invariant over the stored chain.
    fn validate_chain(&self) -> bool;

    /// Validate and atomically swap in `new_chain`.
    fn replace(&self, new_chain: Vec<Block>) -> LedgerResult<()>;

    /// Like [`LedgerApi::replace`], but fails with `TipChanged` if the tip
    /// is no longer `expected_tip`.
    fn replace_if_tip(&self, expected_tip: Hash, new_chain: Vec<Block>) -> LedgerResult<()>;

    /// Current last block.
    fn tip(&self) -> Block;

    /// Number of blocks, genesis included.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_block(&self, index: u64) -> Option<Block>;

    /// Index of the block with `hash`, if it is on the local chain.
    fn position_of(&self, hash: &Hash) -> Option<u64>;

    /// Snapshot of the full chain.
    fn chain(&self) -> Vec<Block>;
}
