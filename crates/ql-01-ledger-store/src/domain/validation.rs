//! Pure structural checks: indices, linkage, Merkle roots and hashes.
//!
//! Signature checks need the key directory and live in the service.

use super::errors::{LedgerError, LedgerResult};
use shared_types::{compute_block_hash, compute_merkle_root, Block, Hash, GENESIS_VALIDATOR};

/// Check that `block` may follow `parent` (or start a chain when `parent` is `None`).
///
/// Runs the same checks regardless of chain length; a genesis-only chain
/// gets no special treatment.
pub fn check_successor(parent: Option<&Block>, block: &Block) -> LedgerResult<()> {
    match parent {
        None => check_genesis(block)?,
        Some(parent) => {
            let expected = parent.index + 1;
            if block.index != expected {
                return Err(LedgerError::IndexMismatch {
                    expected,
                    actual: block.index,
                });
            }
            if block.previous_hash != parent.hash {
                return Err(LedgerError::PrevHashMismatch {
                    index: block.index,
                    expected: parent.hash,
                    actual: block.previous_hash,
                });
            }
        }
    }
    check_content(block)
}

fn check_genesis(block: &Block) -> LedgerResult<()> {
    if block.index != 0 {
        return Err(LedgerError::IndexMismatch {
            expected: 0,
            actual: block.index,
        });
    }
    if block.previous_hash != Hash::ZERO {
        return Err(LedgerError::GenesisInvalid(format!(
            "previous_hash must be the zero hash, got {}",
            block.previous_hash
        )));
    }
    if block.validator.as_str() != GENESIS_VALIDATOR {
        return Err(LedgerError::GenesisInvalid(format!(
            "validator must be '{}', got '{}'",
            GENESIS_VALIDATOR, block.validator
        )));
    }
    if !block.is_canonical_genesis() {
        return Err(LedgerError::GenesisInvalid(format!(
            "block {} is not the canonical genesis",
            block.hash.short()
        )));
    }
    Ok(())
}

/// Merkle root and hash must match the block's content.
fn check_content(block: &Block) -> LedgerResult<()> {
    let merkle = compute_merkle_root(&block.transactions);
    if merkle != block.merkle_root {
        return Err(LedgerError::MerkleRootMismatch {
            index: block.index,
            computed: merkle,
            claimed: block.merkle_root,
        });
    }
    let computed = compute_block_hash(block);
    if computed != block.hash {
        return Err(LedgerError::HashInvalid {
            index: block.index,
            computed,
            claimed: block.hash,
        });
    }
    Ok(())
}

/// Replay [`check_successor`] over a whole chain.
pub fn check_chain_linkage(chain: &[Block]) -> LedgerResult<()> {
    let first = chain.first().ok_or(LedgerError::EmptyChain)?;
    check_successor(None, first)?;
    for pair in chain.windows(2) {
        check_successor(Some(&pair[0]), &pair[1])?;
    }
    Ok(())
}
