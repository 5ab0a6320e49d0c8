//! # Shared Crypto - Block Signing Primitives
//!
//! Signing is a pluggable capability. Subsystems depend on the two traits
//! below and never on a concrete scheme:
//!
//! | Trait | Operation |
//! |-------|-----------|
//! | [`Signer`] | `Sign(message) -> signature` |
//! | [`SignatureVerifier`] | `Verify(pubkey, message, signature) -> bool` |
//!
//! The shipped implementation is Ed25519 (`ed25519-dalek`), with secret key
//! material zeroized on drop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod signatures;

pub use errors::CryptoError;
pub use signatures::{sign_block, Ed25519KeyPair, Ed25519Verifier, SignatureVerifier, Signer};
