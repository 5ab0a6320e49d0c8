//! # Ed25519 Signatures
//!
//! Block proposers sign the 32-byte block hash; peers verify with the
//! proposer's registered public key.

use crate::CryptoError;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use shared_types::{Block, NodeId, PublicKey, Signature};
use zeroize::Zeroize;

/// Produces signatures on behalf of one node.
pub trait Signer: Send + Sync {
    /// Identity whose key this signer holds.
    fn node_id(&self) -> &NodeId;

    /// Public half of the signing key.
    fn public_key(&self) -> PublicKey;

    /// Sign an arbitrary message.
    fn sign(&self, message: &[u8]) -> Signature;
}

/// Checks signatures against a public key.
pub trait SignatureVerifier: Send + Sync {
    /// `true` iff `signature` is valid for `message` under `public_key`.
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool;
}

/// Sign `block.hash` and record the signature under the signer's id.
pub fn sign_block<S: Signer + ?Sized>(block: &mut Block, signer: &S) {
    let signature = signer.sign(block.hash.as_bytes());
    block.signatures.insert(signer.node_id().clone(), signature);
}

/// Ed25519 keypair bound to a node identity.
pub struct Ed25519KeyPair {
    node_id: NodeId,
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a random keypair.
    pub fn generate(node_id: NodeId) -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self {
            node_id,
            signing_key,
        }
    }

    /// Create from a 32-byte secret seed.
    pub fn from_seed(node_id: NodeId, seed: [u8; 32]) -> Self {
        Self {
            node_id,
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Create from a hex-encoded secret seed (as stored in key files).
    pub fn from_hex_seed(node_id: NodeId, seed_hex: &str) -> Result<Self, CryptoError> {
        let mut bytes =
            hex::decode(seed_hex.trim()).map_err(|e| CryptoError::InvalidSeed(e.to_string()))?;
        let seed: Result<[u8; 32], _> = bytes.as_slice().try_into();
        bytes.zeroize();
        let mut seed =
            seed.map_err(|_| CryptoError::InvalidSeed("expected 32 bytes".to_string()))?;
        let pair = Self::from_seed(node_id, seed);
        seed.zeroize();
        Ok(pair)
    }

    /// Hex-encoded secret seed, for persisting to a key file.
    pub fn to_hex_seed(&self) -> String {
        let mut seed = self.signing_key.to_bytes();
        let encoded = hex::encode(seed);
        seed.zeroize();
        encoded
    }
}

impl Signer for Ed25519KeyPair {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// Stateless Ed25519 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    /// Verify, reporting why verification failed.
    pub fn check(
        public_key: &PublicKey,
        message: &[u8],
        signature: &Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(public_key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        Self::check(public_key, message, signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Hash, Transaction};

    fn keypair(id: &str) -> Ed25519KeyPair {
        Ed25519KeyPair::generate(NodeId::from(id))
    }

    #[test]
    fn test_sign_verify() {
        let pair = keypair("N1");
        let signature = pair.sign(b"ledger");
        assert!(Ed25519Verifier.verify(&pair.public_key(), b"ledger", &signature));
    }

    #[test]
    fn test_wrong_message_fails() {
        let pair = keypair("N1");
        let signature = pair.sign(b"message1");
        assert_eq!(
            Ed25519Verifier::check(&pair.public_key(), b"message2", &signature),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let signature = keypair("N1").sign(b"test");
        assert!(!Ed25519Verifier.verify(&keypair("N2").public_key(), b"test", &signature));
    }

    #[test]
    fn test_hex_seed_roundtrip() {
        let original = keypair("N1");
        let restored = Ed25519KeyPair::from_hex_seed(NodeId::from("N1"), &original.to_hex_seed())
            .unwrap();
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_bad_seed_rejected() {
        let result = Ed25519KeyPair::from_hex_seed(NodeId::from("N1"), "abcd");
        assert!(matches!(result, Err(CryptoError::InvalidSeed(_))));
    }

    #[test]
    fn test_sign_block_records_under_signer_id() {
        let pair = keypair("N1");
        let mut block = Block::new(
            1,
            Hash([9; 32]),
            100,
            vec![Transaction::new("a", "b", 1.0, 100)],
            NodeId::from("N1"),
        );
        sign_block(&mut block, &pair);

        let signature = block.proposer_signature().copied().unwrap();
        assert!(Ed25519Verifier.verify(&pair.public_key(), block.hash.as_bytes(), &signature));
    }
}
