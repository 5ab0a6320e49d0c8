//! Driven ports (Outbound dependencies)

use crate::domain::{RegistryResult, ValidatorNode};
use shared_types::Timestamp;

/// Durable storage for validator records.
pub trait RegistryPersistence: Send + Sync {
    fn load(&self) -> RegistryResult<Vec<ValidatorNode>>;
    fn save(&self, nodes: &[ValidatorNode]) -> RegistryResult<()>;
}

/// Wall clock, abstracted for tests.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        shared_types::unix_now()
    }
}
