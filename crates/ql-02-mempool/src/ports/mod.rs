//! Mempool ports.

pub mod inbound;
pub mod outbound;

pub use inbound::MempoolApi;
pub use outbound::SenderDirectory;
