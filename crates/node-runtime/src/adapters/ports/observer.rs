//! Reacts to blocks that peers put on the local chain.
//!
//! - consensus stops tracking any local proposal with the same hash
//! - the mempool drops transactions that are now on chain
//! - transactions from blocks cut off by a fork go back into the mempool,
//!   unless the resulting chain already carries them

use crate::runtime::FinalizationWindow;
use ql_02_mempool::MempoolApi;
use ql_03_validator_registry::RegistryApi;
use ql_04_consensus::{ChainGateway, ConsensusApi};
use ql_05_peer_sync::ChainObserver;
use ql_telemetry::metrics::{CHAIN_HEIGHT, FORKS_RECONCILED, MEMPOOL_SIZE};
use shared_types::{hash_transaction, Block, Hash};
use std::collections::HashSet;
use std::sync::Arc;

pub struct CommitObserver<C, M, R, G>
where
    C: ConsensusApi,
    M: MempoolApi,
    R: RegistryApi,
    G: ChainGateway,
{
    consensus: Arc<C>,
    mempool: Arc<M>,
    registry: Arc<R>,
    chain: Arc<G>,
    activity: Arc<FinalizationWindow>,
}

impl<C, M, R, G> CommitObserver<C, M, R, G>
where
    C: ConsensusApi,
    M: MempoolApi,
    R: RegistryApi,
    G: ChainGateway,
{
    pub fn new(
        consensus: Arc<C>,
        mempool: Arc<M>,
        registry: Arc<R>,
        chain: Arc<G>,
        activity: Arc<FinalizationWindow>,
    ) -> Self {
        Self {
            consensus,
            mempool,
            registry,
            chain,
            activity,
        }
    }
}

impl<C, M, R, G> ChainObserver for CommitObserver<C, M, R, G>
where
    C: ConsensusApi,
    M: MempoolApi,
    R: RegistryApi,
    G: ChainGateway,
{
    fn on_commit(&self, added: &[Block], dropped: &[Block]) {
        let mut included: HashSet<Hash> = HashSet::new();
        let mut pruned = 0;
        for block in added {
            self.consensus.mark_finalized(block);
            self.activity.record();
            if !block.is_genesis() {
                if let Err(e) = self.registry.record_proposal(&block.validator) {
                    tracing::debug!("[runtime] Proposal of #{} not credited: {}", block.index, e);
                }
            }
            included.extend(block.transactions.iter().map(hash_transaction));
            pruned += self.mempool.prune(&block.transactions);
        }

        let mut restored = 0;
        for tx in dropped.iter().flat_map(|b| b.transactions.iter()) {
            let tx_hash = hash_transaction(tx);
            if included.contains(&tx_hash) || self.chain.contains_transaction(&tx_hash) {
                continue;
            }
            if self.mempool.submit(tx.clone()).is_ok() {
                restored += 1;
            }
        }

        if !dropped.is_empty() {
            FORKS_RECONCILED.inc();
            tracing::info!(
                "[runtime] ♻️ Fork dropped {} blocks; {} txs returned to mempool",
                dropped.len(),
                restored
            );
        }
        if pruned > 0 {
            tracing::debug!("[runtime] Pruned {} mempool txs confirmed by peers", pruned);
        }
        if let Some(tip) = added.last() {
            CHAIN_HEIGHT.set(tip.index as f64);
        }
        MEMPOOL_SIZE.set(self.mempool.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ql_02_mempool::{Mempool, MempoolConfig, SenderDirectory};
    use ql_03_validator_registry::{
        InMemoryRegistryStore, NodeRegistration, RegistryConfig, SystemTimeSource,
        ValidatorRegistry,
    };
    use ql_04_consensus::{
        ConsensusResult, ConsensusState, ProposalOutcome, RetryReport, VoteOutcome,
    };
    use parking_lot::Mutex;
    use shared_types::{NodeId, Transaction, Vote, VotePhase};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingConsensus {
        finalized: Mutex<Vec<Hash>>,
    }

    #[async_trait]
    impl ConsensusApi for RecordingConsensus {
        async fn propose_block(&self, _txs: Vec<Transaction>) -> ConsensusResult<ProposalOutcome> {
            unimplemented!("not used by the observer")
        }
        fn on_peer_vote(&self, _vote: Vote) -> ConsensusResult<VoteOutcome> {
            unimplemented!("not used by the observer")
        }
        fn answer_vote_request(&self, _block: &Block, _phase: VotePhase) -> ConsensusResult<Vote> {
            unimplemented!("not used by the observer")
        }
        async fn retry_pending(&self) -> RetryReport {
            RetryReport::default()
        }
        fn mark_finalized(&self, block: &Block) {
            self.finalized.lock().push(block.hash);
        }
        fn state_of(&self, _hash: &Hash) -> Option<ConsensusState> {
            None
        }
        fn pending_retries(&self) -> usize {
            0
        }
    }

    /// Committed chain as a plain list of blocks.
    #[derive(Default)]
    struct FixedChain {
        blocks: Mutex<Vec<Block>>,
    }

    impl ChainGateway for FixedChain {
        fn tip(&self) -> Block {
            self.blocks.lock().last().cloned().unwrap_or_else(Block::genesis)
        }
        fn check_candidate(&self, _block: &Block) -> Result<(), String> {
            Ok(())
        }
        fn append(&self, block: Block) -> Result<(), String> {
            self.blocks.lock().push(block);
            Ok(())
        }
        fn contains_transaction(&self, tx_hash: &Hash) -> bool {
            self.blocks
                .lock()
                .iter()
                .flat_map(|b| b.transactions.iter())
                .any(|tx| hash_transaction(tx) == *tx_hash)
        }
    }

    struct Everyone;

    impl SenderDirectory for Everyone {
        fn is_known(&self, _id: &NodeId) -> bool {
            true
        }
    }

    type TestRegistry = ValidatorRegistry<InMemoryRegistryStore, SystemTimeSource>;

    struct Fixture {
        consensus: Arc<RecordingConsensus>,
        mempool: Arc<Mempool<Everyone>>,
        registry: Arc<TestRegistry>,
        chain: Arc<FixedChain>,
        activity: Arc<FinalizationWindow>,
        observer: CommitObserver<RecordingConsensus, Mempool<Everyone>, TestRegistry, FixedChain>,
    }

    fn make_fixture() -> Fixture {
        let consensus = Arc::new(RecordingConsensus::default());
        let mempool = Arc::new(Mempool::new(Arc::new(Everyone), MempoolConfig::default()));
        let registry = Arc::new(
            ValidatorRegistry::open(
                Arc::new(InMemoryRegistryStore::new()),
                Arc::new(SystemTimeSource),
                RegistryConfig::default(),
            )
            .unwrap(),
        );
        registry
            .register(NodeRegistration::new("N2", "127.0.0.1:7002"))
            .unwrap();
        let chain = Arc::new(FixedChain::default());
        let activity = Arc::new(FinalizationWindow::new(Duration::from_secs(300)));
        let observer = CommitObserver::new(
            consensus.clone(),
            mempool.clone(),
            registry.clone(),
            chain.clone(),
            activity.clone(),
        );
        Fixture {
            consensus,
            mempool,
            registry,
            chain,
            activity,
            observer,
        }
    }

    fn block_with(index: u64, txs: Vec<Transaction>) -> Block {
        Block::new(index, Hash::ZERO, 10, txs, NodeId::new("N2"))
    }

    #[tokio::test]
    async fn test_added_block_prunes_pool_and_credits_proposer() {
        let f = make_fixture();
        let tx = Transaction::new("alice", "bob", 1.0, 5);
        f.mempool.submit(tx.clone()).unwrap();
        let block = block_with(1, vec![tx]);

        f.observer.on_commit(std::slice::from_ref(&block), &[]);

        assert!(f.mempool.is_empty());
        assert_eq!(*f.consensus.finalized.lock(), vec![block.hash]);
        assert_eq!(f.activity.total(), 1);
        let n2 = f.registry.get(&NodeId::new("N2")).unwrap();
        assert_eq!(n2.blocks_proposed, 1);
    }

    #[tokio::test]
    async fn test_dropped_transactions_return_unless_reincluded() {
        let f = make_fixture();
        let kept = Transaction::new("alice", "bob", 1.0, 5);
        let orphaned = Transaction::new("carol", "dave", 2.0, 6);
        let dropped = block_with(2, vec![kept.clone(), orphaned.clone()]);
        let winner = block_with(2, vec![kept]);

        f.observer.on_commit(&[winner], &[dropped]);

        assert_eq!(f.mempool.len(), 1);
        assert_eq!(f.mempool.drain(10), vec![orphaned]);
    }

    #[tokio::test]
    async fn test_dropped_transactions_already_committed_stay_out() {
        let f = make_fixture();
        let settled = Transaction::new("alice", "bob", 3.0, 7);
        let orphaned = Transaction::new("carol", "dave", 4.0, 8);
        f.chain.append(block_with(1, vec![settled.clone()])).unwrap();
        let dropped = block_with(2, vec![settled, orphaned.clone()]);
        let winner = block_with(2, vec![]);

        f.observer.on_commit(&[winner], &[dropped]);

        assert_eq!(f.mempool.drain(10), vec![orphaned]);
    }
}
