//! Ledger domain: error taxonomy, pure linkage checks and chain repair.

pub mod errors;
pub mod repair;
pub mod validation;

pub use errors::{LedgerError, LedgerResult};
pub use repair::{repair_chain_document, RepairReport};
pub use validation::{check_chain_linkage, check_successor};
