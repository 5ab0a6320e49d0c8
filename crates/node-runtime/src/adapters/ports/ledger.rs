//! Ledger store as seen by consensus.

use ql_01_ledger_store::LedgerApi;
use ql_04_consensus::ChainGateway;
use shared_types::{hash_transaction, Block, Hash};
use std::sync::Arc;

/// Adapter: `ChainGateway` → `LedgerApi`.
pub struct LedgerGateway<L: LedgerApi> {
    ledger: Arc<L>,
}

impl<L: LedgerApi> LedgerGateway<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

impl<L: LedgerApi> ChainGateway for LedgerGateway<L> {
    fn tip(&self) -> Block {
        self.ledger.tip()
    }

    fn check_candidate(&self, block: &Block) -> Result<(), String> {
        self.ledger.check_candidate(block).map_err(|e| e.to_string())
    }

    fn append(&self, block: Block) -> Result<(), String> {
        self.ledger.append(block).map_err(|e| e.to_string())
    }

    fn contains_transaction(&self, tx_hash: &Hash) -> bool {
        self.ledger
            .chain()
            .iter()
            .flat_map(|b| b.transactions.iter())
            .any(|tx| hash_transaction(tx) == *tx_hash)
    }
}
