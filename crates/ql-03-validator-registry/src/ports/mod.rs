//! Registry ports.

pub mod inbound;
pub mod outbound;

pub use inbound::RegistryApi;
pub use outbound::{RegistryPersistence, SystemTimeSource, TimeSource};
