//! # Node Container
//!
//! Builds every subsystem from a [`NodeConfig`] and owns the shared handles.
//!
//! ## Initialization order
//!
//! ```text
//! key file ─→ registry ─→ directory ─┬─→ ledger ─→ consensus ─→ observer ─→ peer sync
//!                                    └─→ mempool ──────────────────↑
//! ```
//!
//! The container also exposes the three externally invoked entry points:
//! [`NodeContainer::propose_block`], [`NodeContainer::on_peer_block`] and
//! [`NodeContainer::on_peer_vote`].

pub mod config;

pub use config::{ConfigError, NodeConfig, PeerAddress, ValidatorSeed};

use crate::adapters::{
    keys, CommitObserver, HttpPeerNetwork, LedgerGateway, NetworkSolicitor, RegistryDirectory,
    SimulatedSolicitor, VoteSolicitation,
};
use crate::runtime::FinalizationWindow;
use ql_01_ledger_store::{JsonFileChainStore, LedgerApi, LedgerError, LedgerStore};
use ql_02_mempool::{Mempool, MempoolApi, MempoolConfig, MempoolError};
use ql_03_validator_registry::{
    JsonFileRegistryStore, NodeRegistration, RegistryApi, RegistryConfig, RegistryError,
    SystemTimeSource, ValidatorRegistry,
};
use ql_04_consensus::{
    ConsensusApi, ConsensusConfig, ConsensusEngine, ConsensusResult,
    ConsensusState, ProposalOutcome, RetryReport, VoteOutcome,
};
use ql_05_peer_sync::{
    NodeInfo, PeerSync, PeerSyncApi, ReceiveOutcome, SyncConfig, SyncResult,
};
use ql_telemetry::metrics::{
    BLOCKS_FINALIZED, BLOCKS_RECEIVED, CHAIN_HEIGHT, MEMPOOL_SIZE, PROPOSALS, PROPOSAL_DURATION,
    QUORUM_TIMEOUTS, RETRY_QUEUE_DEPTH, TRANSACTIONS_SUBMITTED, VOTES_RECORDED,
};
use shared_crypto::{Ed25519KeyPair, Ed25519Verifier, Signer};
use shared_types::{Block, Hash, NodeId, Transaction, Vote};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub type Registry = ValidatorRegistry<JsonFileRegistryStore, SystemTimeSource>;
pub type Directory = RegistryDirectory<Registry>;
pub type Ledger = LedgerStore<JsonFileChainStore, Directory, Ed25519Verifier>;
pub type Pool = Mempool<Directory>;
pub type Network = HttpPeerNetwork<Registry>;
pub type Solicitor = VoteSolicitation<Registry, Network>;
pub type Consensus = ConsensusEngine<LedgerGateway<Ledger>, Solicitor, Directory, Directory>;
pub type Observer = CommitObserver<Consensus, Pool, Registry, LedgerGateway<Ledger>>;
pub type SyncService = PeerSync<Ledger, Network, Directory, Observer>;

/// Startup failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file {path}: {reason}")]
    KeyFile { path: PathBuf, reason: String },

    #[error("Validator registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("Ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("HTTP client: {0}")]
    Http(String),
}

/// Every subsystem of one node, wired together.
pub struct NodeContainer {
    pub config: NodeConfig,
    pub registry: Arc<Registry>,
    pub directory: Arc<Directory>,
    pub ledger: Arc<Ledger>,
    pub mempool: Arc<Pool>,
    pub network: Arc<Network>,
    pub consensus: Arc<Consensus>,
    pub sync: Arc<SyncService>,
    pub activity: Arc<FinalizationWindow>,
    keypair: Arc<Ed25519KeyPair>,
}

impl NodeContainer {
    /// Open persisted state under `config.node.data_dir` and wire the subsystems.
    ///
    /// ## Errors
    ///
    /// - `Ledger(MalformedPersisted)`: the chain file is corrupt beyond repair
    /// - `KeyFile`: the key file exists but does not hold a valid seed
    pub fn build(config: NodeConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let data_dir = config.node.data_dir.clone();
        std::fs::create_dir_all(&data_dir).map_err(|source| ContainerError::DataDir {
            path: data_dir.clone(),
            source,
        })?;

        let local_id = config.node.id.clone();
        let key_path = config.key_path();
        let keypair = Arc::new(keys::load_or_create(&key_path, local_id.clone()).map_err(
            |reason| ContainerError::KeyFile {
                path: key_path.clone(),
                reason,
            },
        )?);

        let registry = Arc::new(ValidatorRegistry::open(
            Arc::new(JsonFileRegistryStore::new(config.registry_path())),
            Arc::new(SystemTimeSource),
            RegistryConfig {
                liveness_window_secs: config.consensus.liveness_window.as_secs(),
                ..RegistryConfig::default()
            },
        )?);
        seed_registry(registry.as_ref(), &config, &keypair)?;

        let directory = Arc::new(RegistryDirectory::new(
            registry.clone(),
            local_id.clone(),
            config.mempool.known_accounts.clone(),
        ));

        let ledger = Arc::new(LedgerStore::open(
            Arc::new(JsonFileChainStore::new(config.chain_path())),
            directory.clone(),
            Arc::new(Ed25519Verifier),
        )?);
        if let Some(report) = ledger.repair_report() {
            tracing::warn!(
                "[runtime] 🩹 Chain file was repaired: {} trailing commas, {} trailing bytes (backup: {})",
                report.trailing_commas_removed,
                report.trailing_bytes_dropped,
                report.backup_path.as_deref().unwrap_or("none")
            );
        }

        let mempool = Arc::new(Mempool::new(
            directory.clone(),
            MempoolConfig {
                capacity: config.mempool.capacity,
            },
        ));

        let network = Arc::new(
            HttpPeerNetwork::new(registry.clone(), config.network.request_timeout)
                .map_err(|e| ContainerError::Http(e.to_string()))?,
        );
        let solicitor = if config.consensus.simulate_peer_votes {
            VoteSolicitation::Simulated(SimulatedSolicitor::new(registry.clone()))
        } else {
            VoteSolicitation::Network(NetworkSolicitor::new(network.clone(), local_id.clone()))
        };

        let signer: Arc<dyn Signer> = keypair.clone();
        let gateway = Arc::new(LedgerGateway::new(ledger.clone()));
        let consensus = Arc::new(ConsensusEngine::new(
            gateway.clone(),
            Arc::new(solicitor),
            directory.clone(),
            directory.clone(),
            signer,
            ConsensusConfig {
                vote_timeout: config.consensus.vote_timeout,
                retry_queue_capacity: config.consensus.retry_queue_capacity,
            },
        ));

        let activity = Arc::new(FinalizationWindow::new(config.heartbeat.activity_window));
        let observer = Arc::new(CommitObserver::new(
            consensus.clone(),
            mempool.clone(),
            registry.clone(),
            gateway,
            activity.clone(),
        ));
        let sync = Arc::new(PeerSync::new(
            ledger.clone(),
            network.clone(),
            directory.clone(),
            observer,
            SyncConfig {
                local_id: local_id.clone(),
                request_timeout: config.network.request_timeout,
            },
        ));

        CHAIN_HEIGHT.set(ledger.len().saturating_sub(1) as f64);
        tracing::info!(
            "[runtime] 🧩 Node {} wired: height {}, {} validators known, slice of {}",
            local_id,
            ledger.len().saturating_sub(1),
            registry.all().len(),
            config.local_quorum_slice().len()
        );

        Ok(Self {
            config,
            registry,
            directory,
            ledger,
            mempool,
            network,
            consensus,
            sync,
            activity,
            keypair,
        })
    }

    pub fn local_id(&self) -> &NodeId {
        &self.config.node.id
    }

    /// What this node announces in `NODE_PING`.
    pub fn local_info(&self) -> NodeInfo {
        NodeInfo {
            id: self.local_id().clone(),
            location: self.config.advertise_addr(),
            quorum_slice: self.config.local_quorum_slice(),
            public_key: Some(self.keypair.public_key()),
        }
    }

    /// Build a block from `transactions` and run it through consensus.
    ///
    /// Returns `(finalized, block)`. An unfinalized block waits in the retry
    /// queue. Transactions never go back to the mempool from here: consensus
    /// re-proposes whatever is still uncommitted.
    pub async fn propose_block(
        &self,
        transactions: Vec<Transaction>,
    ) -> ConsensusResult<(bool, Block)> {
        let _timer = ql_telemetry::time_histogram!(PROPOSAL_DURATION);

        match self.consensus.propose_block(transactions).await {
            Ok(outcome) => {
                if let ProposalOutcome::Queued { phase, .. } = &outcome {
                    PROPOSALS.with_label_values(&["queued"]).inc();
                    QUORUM_TIMEOUTS.inc();
                    tracing::warn!(
                        "[runtime] ⏳ Block #{} missed quorum at {}; queued for retry",
                        outcome.block().index,
                        phase
                    );
                } else {
                    PROPOSALS.with_label_values(&["finalized"]).inc();
                }
                RETRY_QUEUE_DEPTH.set(self.consensus.pending_retries() as f64);

                let (finalized, block) = outcome.into_parts();
                if finalized {
                    self.after_local_finalize(&block).await;
                }
                Ok((finalized, block))
            }
            Err(e) => {
                PROPOSALS.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    /// A block delivered by a peer, or replayed locally with `sender = None`.
    pub async fn on_peer_block(
        &self,
        block: Block,
        sender: Option<NodeId>,
    ) -> SyncResult<ReceiveOutcome> {
        let result = self.sync.receive_block(block, sender).await;
        let label = match &result {
            Ok(ReceiveOutcome::Duplicate) => "duplicate",
            Ok(ReceiveOutcome::Genesis) => "genesis",
            Ok(ReceiveOutcome::Appended) => "appended",
            Ok(ReceiveOutcome::Reorganized { .. }) => "reorganized",
            Err(_) => "rejected",
        };
        BLOCKS_RECEIVED.with_label_values(&[label]).inc();
        result
    }

    /// A vote delivered by a peer. If it completes a local proposal, the
    /// finalized block is broadcast.
    pub async fn on_peer_vote(&self, vote: Vote) -> ConsensusResult<VoteOutcome> {
        let hash = vote.block_hash;
        let phase = vote.phase;
        let outcome = self.consensus.on_peer_vote(vote)?;
        if outcome.recorded {
            VOTES_RECORDED.with_label_values(&[phase.as_str()]).inc();
        }

        if outcome.recorded && matches!(outcome.state, Some(ConsensusState::Finalized)) {
            if let Some(block) = self.block_by_hash(&hash) {
                self.after_local_finalize(&block).await;
            }
        }
        Ok(outcome)
    }

    /// Re-drive queued proposals. Outdated ones are rebuilt on the current
    /// tip by consensus, minus anything already committed.
    pub async fn retry_pending(&self) -> RetryReport {
        let report = self.consensus.retry_pending().await;
        for block in &report.finalized {
            self.after_local_finalize(block).await;
        }
        if !report.rebuilt.is_empty() || !report.dropped.is_empty() {
            tracing::info!(
                "[runtime] ♻️ Retry rebuilt {} outdated proposals and dropped {}",
                report.rebuilt.len(),
                report.dropped.len()
            );
        }
        RETRY_QUEUE_DEPTH.set(self.consensus.pending_retries() as f64);
        report
    }

    /// Admit a transaction from a wallet or exchange.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        let result = self.mempool.submit(tx);
        let label = if result.is_ok() { "accepted" } else { "rejected" };
        TRANSACTIONS_SUBMITTED.with_label_values(&[label]).inc();
        MEMPOOL_SIZE.set(self.mempool.len() as f64);
        result
    }

    fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.ledger
            .position_of(hash)
            .and_then(|index| self.ledger.get_block(index))
    }

    async fn after_local_finalize(&self, block: &Block) {
        self.activity.record();
        BLOCKS_FINALIZED.inc();
        CHAIN_HEIGHT.set(self.ledger.len().saturating_sub(1) as f64);
        if let Err(e) = self.registry.record_proposal(self.local_id()) {
            tracing::warn!("[runtime] ⚠️ Could not credit own proposal: {}", e);
        }
        tracing::info!(
            "[runtime] ✅ Block #{} ({}) finalized with {} txs",
            block.index,
            block.hash.short(),
            block.transactions.len()
        );
        self.sync.broadcast(block, None).await;
    }
}

/// Register ourselves, the configured validators, and bootstrap peers.
fn seed_registry(
    registry: &Registry,
    config: &NodeConfig,
    keypair: &Ed25519KeyPair,
) -> Result<(), ContainerError> {
    let local_id = &config.node.id;
    let mut own = NodeRegistration::new(local_id.as_str(), config.advertise_addr())
        .with_public_key(keypair.public_key());
    own.quorum_slice = config.local_quorum_slice();
    registry.register(own)?;

    for seed in config.validators.iter().filter(|s| s.id != *local_id) {
        registry.register(NodeRegistration {
            id: seed.id.clone(),
            location: seed.location.clone(),
            quorum_slice: seed.quorum_slice.clone(),
            public_key: seed.public_key,
        })?;
    }

    for peer in config.bootstrap_peers()? {
        if peer.id != *local_id && registry.get(&peer.id).is_none() {
            registry.register(NodeRegistration::new(peer.id.as_str(), peer.location))?;
        }
    }
    Ok(())
}
