//! Error types for the ledger store.

use shared_types::{Hash, NodeId};

/// Ledger error types.
///
/// Every integrity variant rejects one block or one candidate chain; none of
/// them is fatal to the node except `MalformedPersisted` at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Index mismatch: expected {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("Previous hash mismatch at index {index}: expected {expected}, got {actual}")]
    PrevHashMismatch {
        index: u64,
        expected: Hash,
        actual: Hash,
    },

    #[error("Block hash invalid at index {index}: computed {computed}, claimed {claimed}")]
    HashInvalid {
        index: u64,
        computed: Hash,
        claimed: Hash,
    },

    #[error("Merkle root mismatch at index {index}: computed {computed}, claimed {claimed}")]
    MerkleRootMismatch {
        index: u64,
        computed: Hash,
        claimed: Hash,
    },

    #[error("Signature invalid at index {index} for proposer {validator}: {reason}")]
    SignatureInvalid {
        index: u64,
        validator: NodeId,
        reason: String,
    },

    #[error("Invalid genesis block: {0}")]
    GenesisInvalid(String),

    #[error("Chain is empty")]
    EmptyChain,

    #[error("Tip changed: expected {expected}, found {actual}")]
    TipChanged { expected: Hash, actual: Hash },

    #[error("Persisted chain is malformed: {0}")]
    MalformedPersisted(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// True for errors caused by the content of a block or candidate chain.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::IndexMismatch { .. }
                | LedgerError::PrevHashMismatch { .. }
                | LedgerError::HashInvalid { .. }
                | LedgerError::MerkleRootMismatch { .. }
                | LedgerError::SignatureInvalid { .. }
                | LedgerError::GenesisInvalid(_)
        )
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
