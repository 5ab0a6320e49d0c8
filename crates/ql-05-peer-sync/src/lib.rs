//! # ql-05-peer-sync
//!
//! Moves blocks between nodes and keeps the local chain converged with
//! theirs.
//!
//! ## Receiving a block
//!
//! ```text
//! receive_block(candidate, sender)
//!   ├─ hash already on chain      → Duplicate (sender still counts as live)
//!   ├─ chain empty, index 0       → Genesis
//!   ├─ previous_hash == tip.hash  → append
//!   ├─ previous_hash on chain     → truncate above ancestor, append, replace_if_tip
//!   └─ otherwise                  → PrevHashMismatch, nothing changes
//! ```
//!
//! Anything committed is re-broadcast to every known peer except the sender.
//! A lost compare-and-swap against a concurrent writer is retried once.
//!
//! Outbound sends run concurrently, each bounded by `request_timeout`. A peer
//! that fails is logged and charged through [`ports::PeerDirectory`]; the
//! others are still served.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{NodeInfo, PeerMessage, PeerReply, ReceiveOutcome, SyncError, SyncResult};
pub use ports::{
    BroadcastReport, CatchUpOutcome, ChainObserver, NoopObserver, PeerDirectory, PeerEvent,
    PeerNetwork, PeerSyncApi,
};
pub use service::{PeerSync, SyncConfig};
