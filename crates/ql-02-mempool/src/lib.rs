//! # ql-02-mempool
//!
//! Holds transactions that were admitted but are not yet part of a finalized
//! block.
//!
//! ## Flow
//!
//! ```text
//! wallet / exchange ──submit(tx)──→ [Mempool] ──drain(n)──→ proposer
//!                                      ↑
//!                    prune(included) ──┘  (blocks learned from peers)
//! ```
//!
//! Admission requires a known sender and a finite, non-negative amount.
//! Draining is strictly FIFO and removes what it returns; a proposal that
//! later fails to finalize is retried by consensus with the same block, so
//! drained transactions are never put back.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{MempoolConfig, MempoolError, TransactionPool};
pub use ports::{MempoolApi, SenderDirectory};
pub use service::Mempool;
