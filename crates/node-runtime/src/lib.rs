//! # Node Runtime Library
//!
//! Everything the `quorum-node` binary runs, exposed for integration tests.
//!
//! ## Modules
//!
//! - `container/` - configuration and subsystem wiring
//! - `adapters/` - port implementations connecting subsystems
//! - `handlers/` - peer message dispatch and read-only queries
//! - `http/` - axum routes over the handlers
//! - `runtime/` - heartbeat, discovery and shutdown supervision
//!
//! ## Entry points
//!
//! ```text
//! heartbeat ──ProposeBlock(txs)──→ consensus ──finalized──→ broadcast
//! POST /p2p SEND_BLOCK ──OnPeerBlock──→ peer sync ──→ ledger
//! POST /p2p SEND_VOTE  ──OnPeerVote───→ consensus
//! ```

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod http;
pub mod runtime;

pub use container::{ContainerError, NodeConfig, NodeContainer};
pub use runtime::NodeRuntime;
