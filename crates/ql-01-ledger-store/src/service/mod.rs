//! Ledger store service.

use crate::domain::{check_chain_linkage, check_successor, LedgerError, LedgerResult, RepairReport};
use crate::ports::{ChainPersistence, KeyDirectory, LedgerApi};
use parking_lot::RwLock;
use shared_crypto::SignatureVerifier;
use shared_types::{Block, Hash};
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// The node's ledger.
///
/// The chain is never empty once opened: it always starts at genesis.
pub struct LedgerStore<P, K, V>
where
    P: ChainPersistence,
    K: KeyDirectory,
    V: SignatureVerifier,
{
    persistence: Arc<P>,
    keys: Arc<K>,
    verifier: Arc<V>,
    chain: RwLock<Vec<Block>>,
    repair: Option<RepairReport>,
}

impl<P, K, V> LedgerStore<P, K, V>
where
    P: ChainPersistence,
    K: KeyDirectory,
    V: SignatureVerifier,
{
    /// Load the persisted chain, or bootstrap a genesis-only ledger.
    ///
    /// ## Errors
    ///
    /// - `MalformedPersisted`: the stored chain could not be parsed even after
    ///   repair, or parsed but failed validation
    /// - `Persistence`: the store could not be read or written
    pub fn open(persistence: Arc<P>, keys: Arc<K>, verifier: Arc<V>) -> LedgerResult<Self> {
        let mut store = Self {
            persistence,
            keys,
            verifier,
            chain: RwLock::new(Vec::new()),
            repair: None,
        };

        match store.persistence.load()? {
            None => {
                let genesis = Block::genesis();
                tracing::info!(
                    "[ql-01] 🌱 Bootstrapping ledger with genesis {}",
                    genesis.hash.short()
                );
                store.persistence.save(std::slice::from_ref(&genesis))?;
                *store.chain.get_mut() = vec![genesis];
            }
            Some(loaded) => {
                if let Err(e) = store.check_chain(&loaded.blocks) {
                    tracing::error!("[ql-01] ❌ Persisted chain failed validation: {}", e);
                    return Err(LedgerError::MalformedPersisted(format!(
                        "chain failed validation: {e}"
                    )));
                }
                if loaded.repair.is_some() {
                    store.persistence.save(&loaded.blocks)?;
                    tracing::info!("[ql-01] 🩹 Repaired chain validated and rewritten");
                }
                tracing::info!(
                    "[ql-01] 📚 Ledger opened at height {}",
                    loaded.blocks.len().saturating_sub(1)
                );
                store.repair = loaded.repair;
                *store.chain.get_mut() = loaded.blocks;
            }
        }

        Ok(store)
    }

    /// Report from the repair pass at open, if one was needed.
    pub fn repair_report(&self) -> Option<&RepairReport> {
        self.repair.as_ref()
    }

    /// Proposer signature over `block.hash`. Only the canonical genesis
    /// carries none.
    fn check_signature(&self, block: &Block) -> LedgerResult<()> {
        if block.is_canonical_genesis() {
            return Ok(());
        }
        let invalid = |reason: &str| LedgerError::SignatureInvalid {
            index: block.index,
            validator: block.validator.clone(),
            reason: reason.to_string(),
        };
        let signature = block
            .proposer_signature()
            .ok_or_else(|| invalid("missing proposer signature"))?;
        let key = self
            .keys
            .public_key(&block.validator)
            .ok_or_else(|| invalid("no public key registered"))?;
        if !self
            .verifier
            .verify(&key, block.hash.as_bytes(), signature)
        {
            return Err(invalid("verification failed"));
        }
        Ok(())
    }

    /// Full validation of a candidate chain.
    fn check_chain(&self, chain: &[Block]) -> LedgerResult<()> {
        check_chain_linkage(chain)?;
        for block in chain {
            self.check_signature(block)?;
        }
        Ok(())
    }

    /// Validate the stored chain, reporting the first violation.
    pub fn verify_stored_chain(&self) -> LedgerResult<()> {
        let snapshot = self.chain.read().clone();
        self.check_chain(&snapshot)
    }

    fn swap(&self, expected_tip: Option<Hash>, new_chain: Vec<Block>) -> LedgerResult<()> {
        // Signatures consult the key directory; do that before taking our lock.
        self.check_chain(&new_chain)?;

        let mut chain = self.chain.write();
        if let Some(expected) = expected_tip {
            let actual = chain.last().map(|b| b.hash).unwrap_or(Hash::ZERO);
            if actual != expected {
                return Err(LedgerError::TipChanged { expected, actual });
            }
        }
        self.persistence.save(&new_chain)?;
        tracing::info!(
            "[ql-01] 🔀 Chain replaced: height {} → {}",
            chain.len().saturating_sub(1),
            new_chain.len().saturating_sub(1)
        );
        *chain = new_chain;
        Ok(())
    }
}

impl<P, K, V> LedgerApi for LedgerStore<P, K, V>
where
    P: ChainPersistence,
    K: KeyDirectory,
    V: SignatureVerifier,
{
    fn append(&self, block: Block) -> LedgerResult<()> {
        self.check_signature(&block)?;

        let mut chain = self.chain.write();
        let expected = chain.len() as u64;
        if block.index != expected {
            return Err(LedgerError::IndexMismatch {
                expected,
                actual: block.index,
            });
        }
        check_successor(chain.last(), &block)?;

        let mut next = chain.clone();
        next.push(block);
        self.persistence.save(&next)?;
        *chain = next;

        if let Some(tip) = chain.last() {
            tracing::info!(
                "[ql-01] 📦 Appended block #{} ({}) with {} txs",
                tip.index,
                tip.hash.short(),
                tip.transactions.len()
            );
        }
        Ok(())
    }

    fn check_candidate(&self, block: &Block) -> LedgerResult<()> {
        self.check_signature(block)?;
        let chain = self.chain.read();
        let expected = chain.len() as u64;
        if block.index != expected {
            return Err(LedgerError::IndexMismatch {
                expected,
                actual: block.index,
            });
        }
        check_successor(chain.last(), block)
    }

    fn validate_chain(&self) -> bool {
        match self.verify_stored_chain() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[ql-01] ⚠️ Stored chain invalid: {}", e);
                false
            }
        }
    }

    fn replace(&self, new_chain: Vec<Block>) -> LedgerResult<()> {
        self.swap(None, new_chain)
    }

    fn replace_if_tip(&self, expected_tip: Hash, new_chain: Vec<Block>) -> LedgerResult<()> {
        self.swap(Some(expected_tip), new_chain)
    }

    fn tip(&self) -> Block {
        self.chain.read().last().cloned().unwrap_or_else(Block::genesis)
    }

    fn len(&self) -> u64 {
        self.chain.read().len() as u64
    }

    fn get_block(&self, index: u64) -> Option<Block> {
        self.chain.read().get(index as usize).cloned()
    }

    fn position_of(&self, hash: &Hash) -> Option<u64> {
        self.chain
            .read()
            .iter()
            .rposition(|b| b.hash == *hash)
            .map(|i| i as u64)
    }

    fn chain(&self) -> Vec<Block> {
        self.chain.read().clone()
    }
}
