//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Signature`, `PublicKey`, `NodeId`
//! - **Chain**: `Transaction`, `Block`
//! - **Voting**: `Vote`, `VotePhase`

use crate::errors::DecodeError;
use crate::hashing::{compute_block_hash, compute_merkle_root};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Implements lowercase-hex `Display`/serde for a fixed-width byte newtype.
macro_rules! hex_bytes {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Parse from a hex string.
            pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
                let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
                let actual = bytes.len();
                let arr: [u8; $len] = bytes.try_into().map_err(|_| DecodeError::InvalidLength {
                    expected: $len,
                    actual,
                })?;
                Ok(Self(arr))
            }

            /// Lowercase hex encoding.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash(pub [u8; 32]);

hex_bytes!(Hash, 32);

impl Hash {
    /// The all-zero sentinel used as the genesis block's parent.
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Abbreviated form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// A 64-byte signature over a block hash.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

hex_bytes!(Signature, 64);

/// A 32-byte validator public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

hex_bytes!(PublicKey, 32);

/// Validator / account identifier (e.g. `"N1"`).
///
/// Ordering is lexicographic; proposer selection relies on it to break ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The well-known proposer of the genesis block.
    pub fn genesis() -> Self {
        Self(GENESIS_VALIDATOR.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unix time in whole seconds.
pub type Timestamp = u64;

/// Current unix time in seconds.
pub fn unix_now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// CHAIN
// =============================================================================

/// Identifier of the genesis proposer.
pub const GENESIS_VALIDATOR: &str = "genesis";

/// Metadata note carried by the genesis block.
pub const GENESIS_NOTE: &str = "genesis block";

/// A value transfer between two identities.
///
/// Identity is its canonical serialization; see [`crate::hash_transaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub sender: NodeId,
    pub recipient: NodeId,
    /// Non-negative decimal amount. Admission checks the sign.
    pub amount: f64,
    pub timestamp: Timestamp,
    /// Opaque structured payload.
    #[serde(default)]
    pub note: Value,
    /// Open key/value extension map.
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender: NodeId::new(sender),
            recipient: NodeId::new(recipient),
            amount,
            timestamp,
            note: Value::Null,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_note(mut self, note: Value) -> Self {
        self.note = note;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A block in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub previous_hash: Hash,
    pub hash: Hash,
    /// Proposer.
    pub validator: NodeId,
    #[serde(default)]
    pub signatures: BTreeMap<NodeId, Signature>,
    pub merkle_root: Hash,
    pub nonce: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Block {
    /// Build an unsigned block with its Merkle root and hash filled in.
    pub fn new(
        index: u64,
        previous_hash: Hash,
        timestamp: Timestamp,
        transactions: Vec<Transaction>,
        validator: NodeId,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            merkle_root: compute_merkle_root(&transactions),
            transactions,
            previous_hash,
            hash: Hash::ZERO,
            validator,
            signatures: BTreeMap::new(),
            nonce: 0,
            metadata: BTreeMap::new(),
        };
        block.hash = compute_block_hash(&block);
        block
    }

    /// The deterministic genesis block shared by every node.
    pub fn genesis() -> Self {
        let mut block = Self::new(0, Hash::ZERO, 0, Vec::new(), NodeId::genesis());
        block
            .metadata
            .insert("note".to_string(), Value::String(GENESIS_NOTE.to_string()));
        block.hash = compute_block_hash(&block);
        block
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// True if this block is exactly the deterministic genesis block.
    pub fn is_canonical_genesis(&self) -> bool {
        *self == Self::genesis()
    }

    /// Attach metadata and refresh the hash.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self.hash = compute_block_hash(&self);
        self
    }

    /// Set the nonce and refresh the hash.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self.hash = compute_block_hash(&self);
        self
    }

    /// The proposer's signature, if present.
    pub fn proposer_signature(&self) -> Option<&Signature> {
        self.signatures.get(&self.validator)
    }
}

// =============================================================================
// VOTING
// =============================================================================

/// The four federated-voting phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotePhase {
    Nominate,
    Vote,
    Accept,
    Confirm,
}

impl VotePhase {
    pub const ALL: [VotePhase; 4] = [
        VotePhase::Nominate,
        VotePhase::Vote,
        VotePhase::Accept,
        VotePhase::Confirm,
    ];

    /// The phase after this one, `None` after `Confirm`.
    pub fn next(self) -> Option<VotePhase> {
        match self {
            VotePhase::Nominate => Some(VotePhase::Vote),
            VotePhase::Vote => Some(VotePhase::Accept),
            VotePhase::Accept => Some(VotePhase::Confirm),
            VotePhase::Confirm => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VotePhase::Nominate => "nominate",
            VotePhase::Vote => "vote",
            VotePhase::Accept => "accept",
            VotePhase::Confirm => "confirm",
        }
    }
}

impl fmt::Display for VotePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One voter's vote for one phase of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vote {
    pub block_hash: Hash,
    pub phase: VotePhase,
    pub voter: NodeId,
    pub timestamp: Timestamp,
}

impl Vote {
    pub fn new(block_hash: Hash, phase: VotePhase, voter: NodeId, timestamp: Timestamp) -> Self {
        Self {
            block_hash,
            phase,
            voter,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_roundtrip() {
        let hash = Hash([0xAB; 32]);
        let parsed = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(hash.short(), "abababab");
    }

    #[test]
    fn test_hash_rejects_wrong_length() {
        let err = Hash::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn test_genesis_shape() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, Hash::ZERO);
        assert_eq!(genesis.validator.as_str(), GENESIS_VALIDATOR);
        assert!(genesis.signatures.is_empty());
        assert!(genesis.is_canonical_genesis());
        assert_eq!(genesis.hash, compute_block_hash(&genesis));
    }

    #[test]
    fn test_genesis_is_deterministic() {
        assert_eq!(Block::genesis().hash, Block::genesis().hash);
    }

    #[test]
    fn test_block_rejects_unknown_fields() {
        let mut value = serde_json::to_value(Block::genesis()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .insert("surprise".into(), Value::Bool(true));
        assert!(serde_json::from_value::<Block>(value).is_err());
    }

    #[test]
    fn test_block_rejects_missing_hash() {
        let mut value = serde_json::to_value(Block::genesis()).unwrap();
        value.as_object_mut().unwrap().remove("hash");
        assert!(serde_json::from_value::<Block>(value).is_err());
    }

    #[test]
    fn test_transaction_defaults_optional_fields() {
        let tx: Transaction = serde_json::from_str(
            r#"{"sender":"alice","recipient":"bob","amount":2.5,"timestamp":10}"#,
        )
        .unwrap();
        assert_eq!(tx.note, Value::Null);
        assert!(tx.extra.is_empty());
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(VotePhase::Nominate.next(), Some(VotePhase::Vote));
        assert_eq!(VotePhase::Confirm.next(), None);
        assert_eq!(
            serde_json::to_string(&VotePhase::Accept).unwrap(),
            "\"accept\""
        );
    }
}
