//! # ql-01-ledger-store
//!
//! The ordered, persisted sequence of blocks owned by one node.
//!
//! ## Invariants
//!
//! | Check | Error |
//! |-------|-------|
//! | `block.index == len(chain)` | `IndexMismatch` |
//! | `block.previous_hash == tip.hash` | `PrevHashMismatch` |
//! | `block.merkle_root == MerkleRoot(block.transactions)` | `MerkleRootMismatch` |
//! | `block.hash == H(canonical(block))` | `HashInvalid` |
//! | proposer signature verifies over `block.hash` | `SignatureInvalid` |
//!
//! ## Write path
//!
//! ```text
//! append(block)
//!   │ verify proposer signature     (no ledger lock held)
//!   ↓
//! [write lock] check linkage against tip
//!   │ persist chain + block         (temp file → fsync → rename)
//!   ↓
//! swap in-memory chain, release lock
//! ```
//!
//! Readers take the read lock and never observe a half-written chain.
//!
//! ## Load path
//!
//! A missing chain file bootstraps a genesis-only ledger. An unparseable one
//! gets exactly one best-effort syntactic repair (see [`domain::repair`]);
//! repaired or not, the loaded chain must pass full validation before use,
//! otherwise opening fails with `MalformedPersisted`.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryChainStore, JsonFileChainStore};
pub use domain::{LedgerError, LedgerResult, RepairReport};
pub use ports::{ChainPersistence, KeyDirectory, LedgerApi, LoadedChain};
pub use service::LedgerStore;
