//! Consensus engine service.
//!
//! # Locking
//!
//! All bookkeeping lives behind one mutex that is never held across an
//! `.await`, a ledger call, or a reputation callback. Vote requests fan out
//! concurrently with the lock released.

use crate::domain::{
    ConsensusConfig, ConsensusError, ConsensusResult, ConsensusState, Participation, Proposal,
    ProposalOutcome, RetryQueue, RetryReport, VoteOutcome, VoteTally,
};
use crate::ports::{
    ChainGateway, ConsensusApi, QuorumSliceProvider, ReputationSink, SystemTimeSource, TimeSource,
    VoteSolicitor,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_crypto::{sign_block, Signer};
use shared_types::{hash_transaction, Block, Hash, NodeId, Transaction, Vote, VotePhase};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;


/// Where local progression stopped.
enum Step {
    Awaiting(VotePhase),
    Confirmed,
    Finalized,
    Missing,
}

struct EngineState {
    tally: VoteTally,
    proposals: HashMap<Hash, Proposal>,
    finalized: HashSet<Hash>,
    /// Block index of every hash in `tally` or `finalized`.
    heights: HashMap<Hash, u64>,
    retry: RetryQueue<Hash>,
    /// Refused or evicted proposals, rebuilt by `retry_pending`.
    stale: Vec<Block>,
}

impl EngineState {
    /// Forget votes and finalization marks for blocks below the tip.
    fn prune_below(&mut self, tip_index: u64) {
        let settled: Vec<Hash> = self
            .heights
            .iter()
            .filter(|(hash, height)| **height < tip_index && !self.proposals.contains_key(*hash))
            .map(|(hash, _)| *hash)
            .collect();
        for hash in settled {
            self.heights.remove(&hash);
            self.finalized.remove(&hash);
            self.tally.forget(&hash);
        }
    }
}

/// Federated-voting consensus engine for one node.
pub struct ConsensusEngine<C, V, R, Q>
where
    C: ChainGateway,
    V: VoteSolicitor,
    R: ReputationSink,
    Q: QuorumSliceProvider,
{
    chain: Arc<C>,
    solicitor: Arc<V>,
    reputation: Arc<R>,
    slices: Arc<Q>,
    signer: Arc<dyn Signer>,
    config: ConsensusConfig,
    time_source: Box<dyn TimeSource>,
    inner: Mutex<EngineState>,
}

impl<C, V, R, Q> ConsensusEngine<C, V, R, Q>
where
    C: ChainGateway,
    V: VoteSolicitor,
    R: ReputationSink,
    Q: QuorumSliceProvider,
{
    pub fn new(
        chain: Arc<C>,
        solicitor: Arc<V>,
        reputation: Arc<R>,
        slices: Arc<Q>,
        signer: Arc<dyn Signer>,
        config: ConsensusConfig,
    ) -> Self {
        let retry = RetryQueue::new(config.retry_queue_capacity);
        Self {
            chain,
            solicitor,
            reputation,
            slices,
            signer,
            config,
            time_source: Box::new(SystemTimeSource),
            inner: Mutex::new(EngineState {
                tally: VoteTally::new(),
                proposals: HashMap::new(),
                finalized: HashSet::new(),
                heights: HashMap::new(),
                retry,
                stale: Vec::new(),
            }),
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    fn local_id(&self) -> &NodeId {
        self.signer.node_id()
    }

    /// Distinct slice members that have cast `phase` for `hash`.
    pub fn votes_for(&self, hash: &Hash, phase: VotePhase) -> Vec<NodeId> {
        self.inner.lock().tally.voters(hash, phase)
    }

    /// Cast our own vote for the awaited phase and advance while quorate.
    fn advance_locally(&self, st: &mut EngineState, hash: &Hash, slice: &BTreeSet<NodeId>) -> Step {
        if st.finalized.contains(hash) {
            return Step::Finalized;
        }
        let now = self.time_source.now();
        loop {
            let Some(proposal) = st.proposals.get_mut(hash) else {
                return Step::Missing;
            };
            let Some(phase) = proposal.state.awaiting() else {
                return Step::Confirmed;
            };
            st.tally
                .insert(Vote::new(*hash, phase, self.local_id().clone(), now));
            if !st.tally.is_quorate(hash, phase, slice) {
                return Step::Awaiting(phase);
            }
            proposal.state = ConsensusState::after(phase);
            tracing::info!(
                "[ql-04] 🗳️ Block #{} ({}) quorate at {} → {}",
                proposal.block.index,
                hash.short(),
                phase,
                proposal.state
            );
        }
    }

    fn enqueue_retry(&self, st: &mut EngineState, hash: Hash, phase: VotePhase) {
        tracing::warn!(
            "[ql-04] ⏳ {}; queued for retry",
            ConsensusError::QuorumTimeout { hash, phase }
        );
        if let Some(evicted) = st.retry.push(hash) {
            if let Some(dropped) = st.proposals.remove(&evicted) {
                tracing::warn!(
                    "[ql-04] 🗑️ Retry queue full, dropped proposal #{} ({})",
                    dropped.block.index,
                    evicted.short()
                );
                st.tally.forget(&evicted);
                st.stale.push(dropped.block);
            }
        }
    }

    /// Ask every slice peer that has not yet voted `phase`, in parallel.
    async fn solicit(&self, hash: Hash, block: &Block, phase: VotePhase, peers: Vec<NodeId>) {
        let timeout = self.config.vote_timeout;
        let requests = peers.into_iter().map(|peer| async move {
            let result =
                tokio::time::timeout(timeout, self.solicitor.request_vote(&peer, block, phase)).await;
            (peer, result)
        });
        let responses = futures::future::join_all(requests).await;

        let now = self.time_source.now();
        for (peer, result) in responses {
            let outcome = match result {
                Ok(Ok(true)) => Participation::Voted,
                Ok(Ok(false)) => Participation::Declined,
                Ok(Err(e)) => {
                    tracing::debug!("[ql-04] 📵 Vote request to {} failed: {}", peer, e);
                    Participation::Unreachable
                }
                Err(_) => {
                    tracing::debug!("[ql-04] ⌛ Vote request to {} timed out", peer);
                    Participation::Unreachable
                }
            };
            if outcome == Participation::Voted {
                self.inner
                    .lock()
                    .tally
                    .insert(Vote::new(hash, phase, peer.clone(), now));
            }
            self.reputation.record(&peer, outcome);
        }
    }

    /// Run the phases for a tracked proposal until it finalizes or stalls.
    async fn drive(&self, hash: Hash) -> ConsensusResult<ProposalOutcome> {
        let slice = self.slices.quorum_slice();
        if slice.is_empty() {
            return Err(ConsensusError::EmptyQuorumSlice);
        }

        let block = {
            let mut st = self.inner.lock();
            if st.finalized.contains(&hash) {
                return Err(ConsensusError::AlreadyFinalized(hash));
            }
            let proposal = st
                .proposals
                .get_mut(&hash)
                .ok_or(ConsensusError::UnknownProposal(hash))?;
            proposal.attempts += 1;
            proposal.block.clone()
        };

        loop {
            let (phase, peers) = {
                let mut st = self.inner.lock();
                match self.advance_locally(&mut st, &hash, &slice) {
                    Step::Finalized => return Ok(ProposalOutcome::Finalized(block)),
                    Step::Missing => return Err(ConsensusError::UnknownProposal(hash)),
                    Step::Confirmed => break,
                    Step::Awaiting(phase) => {
                        let me = self.local_id();
                        let peers: Vec<NodeId> = slice
                            .iter()
                            .filter(|id| *id != me && !st.tally.has_voted(&hash, phase, id))
                            .cloned()
                            .collect();
                        (phase, peers)
                    }
                }
            };

            if !peers.is_empty() {
                self.solicit(hash, &block, phase, peers).await;
            }

            let mut st = self.inner.lock();
            if !st.tally.is_quorate(&hash, phase, &slice) {
                if st.finalized.contains(&hash) {
                    return Ok(ProposalOutcome::Finalized(block));
                }
                self.enqueue_retry(&mut st, hash, phase);
                return Ok(ProposalOutcome::Queued { block, phase });
            }
        }

        self.finalize(hash)
    }

    /// Commit a confirmed proposal to the ledger.
    ///
    /// The ledger append happens at most once per hash. A second call returns
    /// `AlreadyFinalized`, which callers treat as a no-op.
    pub fn finalize(&self, hash: Hash) -> ConsensusResult<ProposalOutcome> {
        let block = {
            let mut st = self.inner.lock();
            if st.finalized.contains(&hash) {
                return Err(ConsensusError::AlreadyFinalized(hash));
            }
            let proposal = st
                .proposals
                .get(&hash)
                .ok_or(ConsensusError::UnknownProposal(hash))?;
            if proposal.state != ConsensusState::Confirmed {
                return Err(ConsensusError::NotConfirmed {
                    hash,
                    state: proposal.state,
                });
            }
            let block = proposal.block.clone();
            st.finalized.insert(hash);
            block
        };

        let result = self.chain.append(block.clone());
        let tip_index = self.chain.tip().index;

        let mut st = self.inner.lock();
        st.proposals.remove(&hash);
        st.tally.forget(&hash);
        st.retry.remove(&hash);
        match result {
            Ok(()) => {
                st.prune_below(tip_index);
                tracing::info!(
                    "[ql-04] ✅ Finalized block #{} ({}) with {} txs",
                    block.index,
                    hash.short(),
                    block.transactions.len()
                );
                Ok(ProposalOutcome::Finalized(block))
            }
            Err(e) => {
                st.finalized.remove(&hash);
                tracing::warn!(
                    "[ql-04] ⚠️ Ledger refused confirmed block #{} ({}): {}",
                    block.index,
                    hash.short(),
                    e
                );
                st.stale.push(block);
                Err(ConsensusError::Ledger(e))
            }
        }
    }

    /// Propose the uncommitted part of an outdated block on the current tip.
    async fn rebuild(&self, block: Block, report: &mut RetryReport) {
        let pending: Vec<Transaction> = block
            .transactions
            .iter()
            .filter(|tx| !self.chain.contains_transaction(&hash_transaction(tx)))
            .cloned()
            .collect();
        if pending.is_empty() {
            tracing::info!(
                "[ql-04] 🗑️ Dropping proposal #{} ({}): its transactions are on chain",
                block.index,
                block.hash.short()
            );
            report.dropped.push(block);
            return;
        }

        tracing::info!(
            "[ql-04] ♻️ Rebuilding proposal #{} ({}) with {} of {} txs",
            block.index,
            block.hash.short(),
            pending.len(),
            block.transactions.len()
        );
        match self.propose_block(pending).await {
            Ok(ProposalOutcome::Finalized(block)) => report.finalized.push(block),
            Ok(ProposalOutcome::Queued { block, .. }) => report.rebuilt.push(block),
            Err(ConsensusError::Ledger(_)) => {}
            Err(e) => {
                tracing::warn!(
                    "[ql-04] ⚠️ Could not rebuild proposal #{} ({}): {}",
                    block.index,
                    block.hash.short(),
                    e
                );
                report.dropped.push(block);
            }
        }
    }
}

#[async_trait]
impl<C, V, R, Q> ConsensusApi for ConsensusEngine<C, V, R, Q>
where
    C: ChainGateway,
    V: VoteSolicitor,
    R: ReputationSink,
    Q: QuorumSliceProvider,
{
    async fn propose_block(
        &self,
        transactions: Vec<Transaction>,
    ) -> ConsensusResult<ProposalOutcome> {
        if self.slices.quorum_slice().is_empty() {
            return Err(ConsensusError::EmptyQuorumSlice);
        }

        let tip = self.chain.tip();
        let now = self.time_source.now().max(tip.timestamp);
        let mut block = Block::new(
            tip.index + 1,
            tip.hash,
            now,
            transactions,
            self.local_id().clone(),
        );
        sign_block(&mut block, self.signer.as_ref());
        let hash = block.hash;

        tracing::info!(
            "[ql-04] 📝 Proposing block #{} ({}) with {} txs",
            block.index,
            hash.short(),
            block.transactions.len()
        );
        {
            let mut st = self.inner.lock();
            st.heights.insert(hash, block.index);
            st.proposals.insert(hash, Proposal::new(block, now));
        }

        self.drive(hash).await
    }

    fn on_peer_vote(&self, vote: Vote) -> ConsensusResult<VoteOutcome> {
        let slice = self.slices.quorum_slice();
        if !slice.contains(&vote.voter) {
            return Err(ConsensusError::NotInQuorumSlice { voter: vote.voter });
        }
        let hash = vote.block_hash;
        let next_index = self.chain.tip().index + 1;

        let (recorded, step) = {
            let mut st = self.inner.lock();
            if st.finalized.contains(&hash) {
                return Ok(VoteOutcome {
                    recorded: false,
                    state: Some(ConsensusState::Finalized),
                });
            }
            let recorded = st.tally.insert(vote);
            st.heights.entry(hash).or_insert(next_index);
            if !st.proposals.contains_key(&hash) {
                return Ok(VoteOutcome {
                    recorded,
                    state: None,
                });
            }
            (recorded, self.advance_locally(&mut st, &hash, &slice))
        };

        let state = match step {
            Step::Confirmed => match self.finalize(hash) {
                Ok(_) | Err(ConsensusError::AlreadyFinalized(_)) => Some(ConsensusState::Finalized),
                Err(e) => return Err(e),
            },
            _ => self.state_of(&hash),
        };
        Ok(VoteOutcome { recorded, state })
    }

    fn answer_vote_request(&self, block: &Block, phase: VotePhase) -> ConsensusResult<Vote> {
        self.chain
            .check_candidate(block)
            .map_err(ConsensusError::InvalidCandidate)?;
        let vote = Vote::new(
            block.hash,
            phase,
            self.local_id().clone(),
            self.time_source.now(),
        );
        {
            let mut st = self.inner.lock();
            st.tally.insert(vote.clone());
            st.heights.insert(block.hash, block.index);
        }
        tracing::debug!(
            "[ql-04] 🙋 Voted {} on block #{} ({}) proposed by {}",
            phase,
            block.index,
            block.hash.short(),
            block.validator
        );
        Ok(vote)
    }

    async fn retry_pending(&self) -> RetryReport {
        let (queued, mut outdated) = {
            let mut st = self.inner.lock();
            (st.retry.take_all(), std::mem::take(&mut st.stale))
        };
        let mut report = RetryReport::default();

        for hash in queued {
            let tracked = {
                let st = self.inner.lock();
                st.proposals.get(&hash).map(|p| p.block.clone())
            };
            let Some(block) = tracked else {
                continue;
            };

            if block.previous_hash != self.chain.tip().hash {
                tracing::info!(
                    "[ql-04] 🧹 Proposal #{} ({}) is outdated: tip moved",
                    block.index,
                    hash.short()
                );
                let mut st = self.inner.lock();
                st.proposals.remove(&hash);
                st.tally.forget(&hash);
                st.heights.remove(&hash);
                outdated.push(block);
                continue;
            }

            match self.drive(hash).await {
                Ok(ProposalOutcome::Finalized(block)) => report.finalized.push(block),
                Ok(ProposalOutcome::Queued { .. }) => report.requeued += 1,
                Err(ConsensusError::AlreadyFinalized(_)) => {}
                // Refused blocks wait in `stale` for the next pass.
                Err(ConsensusError::Ledger(_)) => {}
                Err(e) => tracing::warn!("[ql-04] ⚠️ Retry of {} failed: {}", hash.short(), e),
            }
        }

        for block in outdated {
            self.rebuild(block, &mut report).await;
        }

        let tip_index = self.chain.tip().index;
        self.inner.lock().prune_below(tip_index);
        report
    }

    fn mark_finalized(&self, block: &Block) {
        let tip_index = self.chain.tip().index;
        let mut st = self.inner.lock();
        st.finalized.insert(block.hash);
        st.heights.insert(block.hash, block.index);
        st.proposals.remove(&block.hash);
        st.tally.forget(&block.hash);
        st.retry.remove(&block.hash);
        st.prune_below(tip_index);
    }

    fn state_of(&self, hash: &Hash) -> Option<ConsensusState> {
        let st = self.inner.lock();
        if st.finalized.contains(hash) {
            return Some(ConsensusState::Finalized);
        }
        st.proposals.get(hash).map(|p| p.state)
    }

    fn pending_retries(&self) -> usize {
        self.inner.lock().retry.len()
    }
}
