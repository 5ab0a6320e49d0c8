//! Port adapters connecting the subsystems to each other.

pub mod directory;
pub mod ledger;
pub mod observer;

pub use directory::RegistryDirectory;
pub use ledger::LedgerGateway;
pub use observer::CommitObserver;
