//! Peer sync ports.

pub mod inbound;
pub mod outbound;

pub use inbound::{BroadcastReport, CatchUpOutcome, PeerSyncApi};
pub use outbound::{ChainObserver, NoopObserver, PeerDirectory, PeerEvent, PeerNetwork};
