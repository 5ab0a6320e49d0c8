//! Error types for the validator registry.

use shared_types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown validator: {0}")]
    UnknownValidator(NodeId),

    #[error("Invalid registration for {id}: {reason}")]
    InvalidRegistration { id: NodeId, reason: String },

    #[error("Registry persistence error: {0}")]
    Persistence(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
