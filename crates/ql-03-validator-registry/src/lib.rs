//! # ql-03-validator-registry
//!
//! Per-node identity, quorum slice and reputation for every validator this
//! node knows about.
//!
//! ## Reputation
//!
//! Scores are exponential moving averages, clamped to `[0, 1]` after every
//! update:
//!
//! | Outcome | trust | uptime |
//! |---------|-------|--------|
//! | success / online | `min(1, t + 0.05)` | `min(1, u * 0.95 + 0.05)` |
//! | failure / offline | `max(0, t - 0.10)` | `max(0, u * 0.995)` |
//!
//! ## Proposer selection
//!
//! Among nodes seen within the liveness window, the highest
//! `trust * uptime` wins; ties go to the lexicographically lowest id.
//!
//! Nodes are never deleted. A node that stops talking simply falls out of
//! the liveness window.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryRegistryStore, JsonFileRegistryStore};
pub use domain::{
    select_proposer, NodeRegistration, RegistryConfig, RegistryError, RegistryResult,
    ReputationPolicy, ValidatorNode, ValidatorStats,
};
pub use ports::{RegistryApi, RegistryPersistence, SystemTimeSource, TimeSource};
pub use service::ValidatorRegistry;
