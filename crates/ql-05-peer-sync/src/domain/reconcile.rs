//! Fork reconciliation.

use shared_types::Block;

/// What a received block did to the local chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    /// Already on the chain; nothing changed.
    Duplicate,
    /// Accepted as genesis of an empty chain.
    Genesis,
    /// Extended the tip.
    Appended,
    /// Replaced everything above `ancestor_index` with the received block.
    Reorganized {
        ancestor_index: u64,
        /// Local blocks that were cut off, oldest first.
        dropped: Vec<Block>,
    },
}

impl ReceiveOutcome {
    /// True if the local chain changed.
    pub fn committed(&self) -> bool {
        !matches!(self, ReceiveOutcome::Duplicate)
    }
}

/// Truncate `chain` to `[0..=ancestor]` and append `candidate`.
///
/// Returns the new chain and the blocks that were cut off. `ancestor` must be
/// a valid position in `chain`.
pub fn splice_fork(mut chain: Vec<Block>, ancestor: usize, candidate: Block) -> (Vec<Block>, Vec<Block>) {
    let dropped = chain.split_off((ancestor + 1).min(chain.len()));
    chain.push(candidate);
    (chain, dropped)
}

/// Why a remote chain would not be adopted, if it would not.
pub fn catch_up_refusal(local: &[Block], remote: &[Block]) -> Option<String> {
    let Some(remote_genesis) = remote.first() else {
        return Some("remote chain is empty".to_string());
    };
    if let Some(local_genesis) = local.first() {
        if local_genesis.hash != remote_genesis.hash {
            return Some(format!(
                "genesis differs: local {}, remote {}",
                local_genesis.hash.short(),
                remote_genesis.hash.short()
            ));
        }
    }
    if remote.len() <= local.len() {
        return Some(format!(
            "remote height {} does not exceed local height {}",
            remote.len(),
            local.len()
        ));
    }
    None
}
