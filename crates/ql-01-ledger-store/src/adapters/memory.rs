use crate::domain::LedgerResult;
use crate::ports::{ChainPersistence, LoadedChain};
use parking_lot::RwLock;
use shared_types::Block;

/// Volatile chain storage for tests and ephemeral nodes.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    blocks: RwLock<Option<Vec<Block>>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store as if `blocks` had been persisted earlier.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: RwLock::new(Some(blocks)),
        }
    }

    /// Last saved chain, if any.
    pub fn saved(&self) -> Option<Vec<Block>> {
        self.blocks.read().clone()
    }
}

impl ChainPersistence for InMemoryChainStore {
    fn load(&self) -> LedgerResult<Option<LoadedChain>> {
        Ok(self.blocks.read().clone().map(|blocks| LoadedChain {
            blocks,
            repair: None,
        }))
    }

    fn save(&self, chain: &[Block]) -> LedgerResult<()> {
        *self.blocks.write() = Some(chain.to_vec());
        Ok(())
    }
}
