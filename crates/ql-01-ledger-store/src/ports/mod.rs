//! Ports for the ledger store.

pub mod inbound;
pub mod outbound;

pub use inbound::LedgerApi;
pub use outbound::{ChainPersistence, KeyDirectory, LoadedChain};
