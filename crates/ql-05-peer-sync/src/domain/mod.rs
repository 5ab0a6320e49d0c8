//! Peer sync domain: wire messages, reconciliation rules, errors.

pub mod errors;
pub mod messages;
pub mod reconcile;

pub use errors::{SyncError, SyncResult};
pub use messages::{NodeInfo, PeerMessage, PeerReply};
pub use reconcile::{catch_up_refusal, splice_fork, ReceiveOutcome};
