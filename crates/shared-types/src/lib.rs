//! # Shared Types Crate
//!
//! Value types that travel between every Quorum-Ledger subsystem.
//!
//! ## Contents
//!
//! - **entities**: `Hash`, `NodeId`, `Transaction`, `Block`, `Vote`, `VotePhase`
//! - **hashing**: canonical serialization, block hashes and Merkle roots
//! - **errors**: decoding failures for hex-encoded primitives
//!
//! ## Canonical form
//!
//! A block hash covers every field except `hash` and `signatures`, serialized
//! as JSON with object keys sorted at every depth:
//!
//! ```text
//! {"index":..,"merkle_root":..,"metadata":{..},"nonce":..,
//!  "previous_hash":..,"timestamp":..,"transactions":[..],"validator":..}
//!                               │
//!                           SHA-256
//!                               ↓
//!                          block.hash
//! ```

pub mod entities;
pub mod errors;
pub mod hashing;

pub use entities::*;
pub use errors::*;
pub use hashing::{canonical_json, compute_block_hash, compute_merkle_root, hash_transaction, sha256};
