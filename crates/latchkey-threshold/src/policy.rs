//! Encryption policies and the encrypted payload envelope.

use serde::{Deserialize, Serialize};

use latchkey_core::ObjectId;
use rand::Rng;

use crate::cipher::EncryptionNonce;
use crate::error::{Result, ThresholdError};

/// Addresses one encryption under one asset's access policy.
///
/// The asset id ties authorization to the asset's current grants; the
/// nonce makes every encryption its own policy, so key servers never
/// confuse two ciphertexts under the same asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId {
    /// The asset whose grants gate decryption.
    pub asset_id: ObjectId,

    /// Random per-encryption nonce.
    pub nonce: [u8; 32],
}

impl PolicyId {
    /// Create a fresh policy for an asset.
    pub fn new(asset_id: ObjectId) -> Self {
        Self {
            asset_id,
            nonce: rand::thread_rng().gen(),
        }
    }

    /// Fixed-width byte form, used in key derivation.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(self.asset_id.as_bytes());
        bytes[32..].copy_from_slice(&self.nonce);
        bytes
    }
}

/// Format identifier for encrypted payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// The output of threshold encryption.
///
/// Self-describing: everything a holder needs to attempt decryption is
/// here, but actually decrypting requires `threshold` key servers to
/// approve against the policy's current grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Encryption algorithm used.
    pub format: EncryptionFormat,

    /// The policy this ciphertext was encrypted under.
    pub policy_id: PolicyId,

    /// Minimum number of key-server shares needed to reconstruct.
    pub threshold: u8,

    /// Plaintext length in bytes.
    pub source_size: u64,

    /// AEAD nonce.
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes the authentication tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .map_err(|e| ThresholdError::MalformedCiphertext(e.to_string()))
    }

    /// Length of the ciphertext in bytes.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}
