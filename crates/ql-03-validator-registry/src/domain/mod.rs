//! Registry domain.

pub mod errors;
pub mod node;
pub mod reputation;
pub mod selection;

pub use errors::{RegistryError, RegistryResult};
pub use node::{NodeRegistration, RegistryConfig, ValidatorNode, ValidatorStats};
pub use reputation::ReputationPolicy;
pub use selection::select_proposer;
