//! Symmetric encryption of payload bytes.
//!
//! The quorum shares a scalar secret; the actual payload cipher is
//! ChaCha20-Poly1305 under a key derived from that secret and the
//! policy identifier.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use curve25519_dalek::scalar::Scalar;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, ThresholdError};
use crate::policy::PolicyId;

/// A 256-bit symmetric key for ChaCha20-Poly1305.
///
/// Wiped on drop; it only ever lives briefly on either side of a quorum
/// round-trip.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| ThresholdError::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| ThresholdError::Encryption(e.to_string()))
    }

    /// Decrypt data with this key.
    ///
    /// Fails when the ciphertext was tampered with or the key is wrong;
    /// the AEAD tag does not distinguish the two.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| ThresholdError::MalformedCiphertext(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| {
                ThresholdError::MalformedCiphertext("authentication failed".to_string())
            })
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Derive the payload key from the shared secret and the policy.
///
/// Binding the policy id into the derivation keeps keys separated even
/// if two policies ever ended up sharing a secret.
pub fn derive_content_key(secret: &Scalar, policy: &PolicyId) -> EncryptionKey {
    let mut hasher = blake3::Hasher::new_derive_key("latchkey-threshold-v0-content-key");
    hasher.update(secret.as_bytes());
    hasher.update(&policy.to_bytes());
    EncryptionKey(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::ObjectId;

    fn policy() -> PolicyId {
        PolicyId {
            asset_id: ObjectId::from_bytes([0x11; 32]),
            nonce: [0x22; 32],
        }
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = EncryptionKey::from_bytes([7; 32]);
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"workflow payload", &nonce).unwrap();
        assert_ne!(ciphertext.as_slice(), b"workflow payload");

        let plaintext = key.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(plaintext, b"workflow payload");
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = EncryptionKey::from_bytes([7; 32]);
        let other = EncryptionKey::from_bytes([8; 32]);
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"secret", &nonce).unwrap();
        assert!(matches!(
            other.decrypt(&ciphertext, &nonce),
            Err(ThresholdError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_derivation_deterministic() {
        let secret = Scalar::from(42u64);
        let a = derive_content_key(&secret, &policy());
        let b = derive_content_key(&secret, &policy());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_derivation_binds_policy() {
        let secret = Scalar::from(42u64);
        let mut other_policy = policy();
        other_policy.nonce = [0x33; 32];

        let a = derive_content_key(&secret, &policy());
        let b = derive_content_key(&secret, &other_policy);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
