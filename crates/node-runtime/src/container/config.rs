//! # Node Configuration
//!
//! One explicit context object handed to every subsystem constructor.
//!
//! ## Sources, in order
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config` or `QL_CONFIG`)
//! 3. `QL_*` environment overrides
//!
//! The result is checked with [`NodeConfig::validate`] before use.
//!
//! ```toml
//! [node]
//! id = "N1"
//! data_dir = "./data/n1"
//! listen_addr = "127.0.0.1:7001"
//!
//! [consensus]
//! quorum_slice = ["N1", "N2", "N3"]
//!
//! [discovery]
//! bootstrap_peers = ["N2@127.0.0.1:7002"]
//! ```

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use shared_types::{NodeId, PublicKey};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "QL_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub consensus: ConsensusSettings,
    pub heartbeat: HeartbeatSettings,
    pub discovery: DiscoverySettings,
    pub mempool: MempoolSettings,
    pub network: NetworkSettings,
    /// Validators registered at bootstrap.
    pub validators: Vec<ValidatorSeed>,
}

/// Identity and local resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSettings {
    pub id: NodeId,
    /// Holds `chain.json`, `validators.json` and, by default, the key file.
    pub data_dir: PathBuf,
    pub listen_addr: SocketAddr,
    /// Address peers use to reach this node. Falls back to `listen_addr`.
    pub advertise_addr: Option<String>,
    /// Hex-encoded Ed25519 seed. Generated on first start if missing.
    pub key_file: Option<PathBuf>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            id: NodeId::new("N1"),
            data_dir: PathBuf::from("./data"),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 7000)),
            advertise_addr: None,
            key_file: None,
        }
    }
}

/// Voting parameters.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsensusSettings {
    /// Local quorum slice. The local node is always a member.
    pub quorum_slice: BTreeSet<NodeId>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "liveness_window_secs")]
    pub liveness_window: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "vote_timeout_ms")]
    pub vote_timeout: Duration,
    pub retry_queue_capacity: usize,
    pub max_block_transactions: usize,
    /// Answer vote requests locally from registry scores instead of asking peers.
    pub simulate_peer_votes: bool,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            quorum_slice: BTreeSet::new(),
            liveness_window: Duration::from_secs(120),
            vote_timeout: Duration::from_millis(3000),
            retry_queue_capacity: 64,
            max_block_transactions: 100,
            simulate_peer_votes: true,
        }
    }
}

/// Adaptive heartbeat.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeartbeatSettings {
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "min_interval_secs")]
    pub min_interval: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "max_interval_secs")]
    pub max_interval: Duration,
    /// How far back finalizations count as recent activity.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "activity_window_secs")]
    pub activity_window: Duration,
    /// Recent finalizations at which the interval bottoms out at `min_interval`.
    pub saturation_blocks: usize,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(30),
            activity_window: Duration::from_secs(300),
            saturation_blocks: 30,
        }
    }
}

/// Peer discovery.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySettings {
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "interval_secs")]
    pub interval: Duration,
    /// `id@host:port` entries.
    pub bootstrap_peers: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            bootstrap_peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MempoolSettings {
    pub capacity: usize,
    /// Non-validator identities allowed to submit transactions.
    pub known_accounts: BTreeSet<NodeId>,
}

impl Default for MempoolSettings {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            known_accounts: BTreeSet::new(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "request_timeout_ms")]
    pub request_timeout: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(3000),
        }
    }
}

/// A validator known before the node ever talks to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorSeed {
    pub id: NodeId,
    pub location: String,
    #[serde(default)]
    pub public_key: Option<PublicKey>,
    #[serde(default)]
    pub quorum_slice: BTreeSet<NodeId>,
}

/// A parsed `id@host:port` bootstrap entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddress {
    pub id: NodeId,
    pub location: String,
}

impl PeerAddress {
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Invalid(format!("bootstrap peer {entry:?} is not id@host:port"));
        let (id, location) = entry.trim().split_once('@').ok_or_else(invalid)?;
        if id.is_empty() || !location.contains(':') {
            return Err(invalid());
        }
        Ok(Self {
            id: NodeId::new(id),
            location: location.to_string(),
        })
    }
}

impl NodeConfig {
    /// Defaults for `id`, everything else untouched.
    pub fn for_node(id: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.node.id = NodeId::new(id);
        config
    }

    /// Load from `path` (or `QL_CONFIG`), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `QL_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("QL_NODE_ID") {
            self.node.id = NodeId::new(id);
        }
        if let Some(dir) = lookup("QL_DATA_DIR") {
            self.node.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("QL_LISTEN_ADDR") {
            self.node.listen_addr = addr.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "QL_LISTEN_ADDR".to_string(),
                value: addr,
            })?;
        }
        if let Some(addr) = lookup("QL_ADVERTISE_ADDR") {
            self.node.advertise_addr = Some(addr);
        }
        if let Some(path) = lookup("QL_KEY_FILE") {
            self.node.key_file = Some(PathBuf::from(path));
        }
        if let Some(peers) = lookup("QL_BOOTSTRAP_PEERS") {
            self.discovery.bootstrap_peers = split_list(&peers).map(str::to_string).collect();
        }
        if let Some(slice) = lookup("QL_QUORUM_SLICE") {
            self.consensus.quorum_slice = split_list(&slice).map(NodeId::new).collect();
        }
        if let Some(accounts) = lookup("QL_KNOWN_ACCOUNTS") {
            self.mempool.known_accounts = split_list(&accounts).map(NodeId::new).collect();
        }
        if let Some(flag) = lookup("QL_SIMULATE_VOTES") {
            self.consensus.simulate_peer_votes = match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "QL_SIMULATE_VOTES".to_string(),
                        value: flag,
                    })
                }
            };
        }
        Ok(())
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("node.id must not be empty".into()));
        }
        let hb = &self.heartbeat;
        if hb.min_interval.is_zero() || hb.min_interval > hb.max_interval {
            return Err(ConfigError::Invalid(format!(
                "heartbeat interval bounds {}s..{}s are inverted or zero",
                hb.min_interval.as_secs(),
                hb.max_interval.as_secs()
            )));
        }
        if hb.saturation_blocks == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat.saturation_blocks must be positive".into(),
            ));
        }
        if self.consensus.retry_queue_capacity == 0 || self.consensus.max_block_transactions == 0 {
            return Err(ConfigError::Invalid(
                "consensus queue and block sizes must be positive".into(),
            ));
        }
        if self.discovery.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "discovery.interval_secs must be positive".into(),
            ));
        }
        self.bootstrap_peers()?;
        Ok(())
    }

    pub fn bootstrap_peers(&self) -> Result<Vec<PeerAddress>, ConfigError> {
        self.discovery
            .bootstrap_peers
            .iter()
            .map(|entry| PeerAddress::parse(entry))
            .collect()
    }

    /// Address advertised to peers in `NODE_PING`.
    pub fn advertise_addr(&self) -> String {
        self.node
            .advertise_addr
            .clone()
            .unwrap_or_else(|| self.node.listen_addr.to_string())
    }

    /// The configured slice plus the local node.
    pub fn local_quorum_slice(&self) -> BTreeSet<NodeId> {
        let mut slice = self.consensus.quorum_slice.clone();
        slice.insert(self.node.id.clone());
        slice
    }

    pub fn chain_path(&self) -> PathBuf {
        self.node.data_dir.join("chain.json")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.node.data_dir.join("validators.json")
    }

    pub fn key_path(&self) -> PathBuf {
        self.node
            .key_file
            .clone()
            .unwrap_or_else(|| self.node.data_dir.join("node.key"))
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_validate() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consensus.retry_queue_capacity, 64);
        assert_eq!(config.consensus.liveness_window, Duration::from_secs(120));
        assert_eq!(config.heartbeat.min_interval, Duration::from_secs(10));
        assert_eq!(config.heartbeat.max_interval, Duration::from_secs(30));
        assert_eq!(config.network.request_timeout, Duration::from_millis(3000));
    }

    #[test]
    fn test_toml_uses_unit_suffixed_keys() {
        let config = NodeConfig::from_toml_str(
            r#"
            [node]
            id = "N2"
            listen_addr = "0.0.0.0:7002"

            [consensus]
            quorum_slice = ["N1", "N2", "N3"]
            vote_timeout_ms = 500
            liveness_window_secs = 60

            [heartbeat]
            min_interval_secs = 2
            max_interval_secs = 8

            [[validators]]
            id = "N1"
            location = "127.0.0.1:7001"
            "#,
        )
        .unwrap();

        assert_eq!(config.node.id, NodeId::new("N2"));
        assert_eq!(config.consensus.vote_timeout, Duration::from_millis(500));
        assert_eq!(config.consensus.liveness_window, Duration::from_secs(60));
        assert_eq!(config.heartbeat.max_interval, Duration::from_secs(8));
        assert_eq!(config.heartbeat.saturation_blocks, 30);
        assert_eq!(config.validators.len(), 1);
        assert_eq!(config.validators[0].public_key, None);
        assert_eq!(config.consensus.quorum_slice.len(), 3);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = NodeConfig::from_toml_str("[node]\nidentity = \"N1\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("QL_NODE_ID", "N3"),
            ("QL_LISTEN_ADDR", "127.0.0.1:9003"),
            ("QL_BOOTSTRAP_PEERS", "N1@127.0.0.1:9001, N2@127.0.0.1:9002"),
            ("QL_QUORUM_SLICE", "N1,N2"),
            ("QL_SIMULATE_VOTES", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.node.id, NodeId::new("N3"));
        assert_eq!(config.node.listen_addr.port(), 9003);
        assert!(!config.consensus.simulate_peer_votes);
        assert_eq!(config.bootstrap_peers().unwrap().len(), 2);
        let slice = config.local_quorum_slice();
        assert!(slice.contains(&NodeId::new("N3")));
        assert_eq!(slice.len(), 3);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = NodeConfig::default();
        let err = config
            .apply_overrides(|key| (key == "QL_LISTEN_ADDR").then(|| "nowhere".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_inverted_heartbeat_bounds() {
        let mut config = NodeConfig::default();
        config.heartbeat.min_interval = Duration::from_secs(60);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_peer_address_parsing() {
        let peer = PeerAddress::parse("N2@10.0.0.2:7000").unwrap();
        assert_eq!(peer.id, NodeId::new("N2"));
        assert_eq!(peer.location, "10.0.0.2:7000");
        assert!(PeerAddress::parse("10.0.0.2:7000").is_err());
        assert!(PeerAddress::parse("@10.0.0.2:7000").is_err());
        assert!(PeerAddress::parse("N2@localhost").is_err());
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let mut config = NodeConfig::default();
        config.node.data_dir = PathBuf::from("/var/lib/ql");
        assert_eq!(config.chain_path(), PathBuf::from("/var/lib/ql/chain.json"));
        assert_eq!(config.key_path(), PathBuf::from("/var/lib/ql/node.key"));
        assert_eq!(config.advertise_addr(), "127.0.0.1:7000");
    }
}
