//! # Handlers
//!
//! Transport-independent request handling. The HTTP layer only decodes,
//! calls into here, and encodes.

pub mod peer;
pub mod query;

pub use peer::dispatch;
pub use query::{NodeStatus, SubmitReceipt};
