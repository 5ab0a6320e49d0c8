//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Bytes do not decode to a curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Secret seed could not be decoded
    #[error("Invalid secret seed: {0}")]
    InvalidSeed(String),
}
