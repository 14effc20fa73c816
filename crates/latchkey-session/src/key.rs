//! Time-boxed session credentials.
//!
//! A [`SessionKey`] binds a principal's signature to one asset for a
//! bounded lifetime. Its states are linear: created unsigned, signed
//! exactly once by the owner, used any number of times, then expired.
//! There is no renewal; after expiry a fresh key must be created.

use rand::Rng;
use serde::{Deserialize, Serialize};

use latchkey_core::{
    from_cbor_bytes, minutes_to_millis, now_millis, to_canonical_bytes, CoreError,
    Ed25519PublicKey, Ed25519Signature, ObjectId,
};

use crate::error::{Result, SessionError};

/// Domain prefix for session challenge messages.
const CHALLENGE_DOMAIN: &[u8] = b"latchkey-session-v0:";

/// Build the challenge message a session owner signs.
///
/// Deterministic over the key's identity fields, so the same key always
/// presents the same challenge. The expiry is bound into the message:
/// a verifier can trust `expires_at` because tampering with it breaks
/// the signature.
pub(crate) fn challenge_bytes(
    owner: &Ed25519PublicKey,
    scope: &ObjectId,
    nonce: &[u8; 32],
    expires_at: i64,
) -> Vec<u8> {
    let mut message =
        Vec::with_capacity(CHALLENGE_DOMAIN.len() + 32 + 32 + 32 + 8);
    message.extend_from_slice(CHALLENGE_DOMAIN);
    message.extend_from_slice(owner.as_bytes());
    message.extend_from_slice(scope.as_bytes());
    message.extend_from_slice(nonce);
    message.extend_from_slice(&expires_at.to_be_bytes());
    message
}

/// A short-lived credential authorizing cryptographic operations on one
/// asset.
///
/// Fields are private so the signed flag can only change through
/// [`SessionKey::apply_signature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
    /// The principal this key belongs to.
    owner: Ed25519PublicKey,

    /// The asset whose policies this key may operate on.
    scope: ObjectId,

    /// Creation nonce; makes each key's challenge unique.
    nonce: [u8; 32],

    /// When the key was created (Unix milliseconds).
    created_at: i64,

    /// When the key stops being usable (Unix milliseconds).
    expires_at: i64,

    /// The owner's signature over the challenge message, once applied.
    signature: Option<Ed25519Signature>,
}

impl SessionKey {
    /// Create an unsigned session key valid for `ttl_minutes`.
    ///
    /// Pure construction, no I/O. A zero TTL produces a key that is
    /// already expired, which is occasionally useful and never
    /// dangerous: expired keys are refused everywhere.
    pub fn create(owner: Ed25519PublicKey, scope: ObjectId, ttl_minutes: u32) -> Self {
        let created_at = now_millis();
        Self {
            owner,
            scope,
            nonce: rand::thread_rng().gen(),
            created_at,
            expires_at: created_at + minutes_to_millis(ttl_minutes),
            signature: None,
        }
    }

    /// The principal this key belongs to.
    pub fn owner(&self) -> &Ed25519PublicKey {
        &self.owner
    }

    /// The asset this key is scoped to.
    pub fn scope(&self) -> ObjectId {
        self.scope
    }

    /// Creation nonce.
    pub fn nonce(&self) -> &[u8; 32] {
        &self.nonce
    }

    /// When the key was created (Unix milliseconds).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// When the key stops being usable (Unix milliseconds).
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// The applied signature, if the key has been signed.
    pub fn signature(&self) -> Option<&Ed25519Signature> {
        self.signature.as_ref()
    }

    /// Whether the owner has signed the challenge.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Whether the key is expired at `now`.
    ///
    /// The boundary counts as expired, so a zero-TTL key is unusable
    /// from the instant it is created.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// The challenge message the owner must sign.
    ///
    /// Stable across calls for the same key.
    pub fn challenge_message(&self) -> Vec<u8> {
        challenge_bytes(&self.owner, &self.scope, &self.nonce, self.expires_at)
    }

    /// Apply the owner's signature over the challenge message.
    ///
    /// Fails with [`SessionError::SignatureMismatch`] if the signature
    /// was not produced by the owner over this key's exact challenge;
    /// the key stays unsigned in that case. Re-applying the same valid
    /// signature is a no-op, so duplicate signing prompts are harmless.
    pub fn apply_signature(&mut self, signature: Ed25519Signature) -> Result<()> {
        self.owner
            .verify(&self.challenge_message(), &signature)
            .map_err(|_| SessionError::SignatureMismatch)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Serialize the key to a hex string.
    pub fn export(&self) -> Result<String> {
        Ok(hex::encode(to_canonical_bytes(self)?))
    }

    /// Deserialize a key previously produced by [`SessionKey::export`].
    ///
    /// Rejects keys whose lifetime has already passed; an expired key
    /// can never be revived by re-importing it.
    pub fn import(serialized: &str) -> Result<Self> {
        let bytes = hex::decode(serialized)
            .map_err(|e| CoreError::DecodingError(format!("invalid hex: {}", e)))?;
        let key: Self = from_cbor_bytes(&bytes)?;
        if key.is_expired(now_millis()) {
            return Err(SessionError::Expired {
                expires_at: key.expires_at,
            });
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::Keypair;

    fn scope() -> ObjectId {
        ObjectId::from_bytes([0x11; 32])
    }

    #[test]
    fn test_create_unsigned() {
        let owner = Keypair::generate();
        let key = SessionKey::create(owner.public_key(), scope(), 10);

        assert!(!key.is_signed());
        assert!(!key.is_expired(now_millis()));
        assert_eq!(key.expires_at() - key.created_at(), 10 * 60 * 1000);
    }

    #[test]
    fn test_zero_ttl_is_born_expired() {
        let owner = Keypair::generate();
        let key = SessionKey::create(owner.public_key(), scope(), 0);
        assert!(key.is_expired(now_millis()));
    }

    #[test]
    fn test_challenge_is_stable() {
        let owner = Keypair::generate();
        let key = SessionKey::create(owner.public_key(), scope(), 10);
        assert_eq!(key.challenge_message(), key.challenge_message());

        // A different key presents a different challenge (fresh nonce).
        let other = SessionKey::create(owner.public_key(), scope(), 10);
        assert_ne!(key.challenge_message(), other.challenge_message());
    }

    #[test]
    fn test_apply_signature() {
        let owner = Keypair::generate();
        let mut key = SessionKey::create(owner.public_key(), scope(), 10);

        let signature = owner.sign(&key.challenge_message());
        key.apply_signature(signature).unwrap();
        assert!(key.is_signed());

        // Re-applying the same signature leaves the key signed.
        key.apply_signature(signature).unwrap();
        assert!(key.is_signed());
    }

    #[test]
    fn test_wrong_message_signature_rejected() {
        let owner = Keypair::generate();
        let mut key = SessionKey::create(owner.public_key(), scope(), 10);

        let signature = owner.sign(b"some other message");
        let err = key.apply_signature(signature).unwrap_err();
        assert!(matches!(err, SessionError::SignatureMismatch));
        assert!(!key.is_signed());
    }

    #[test]
    fn test_other_signer_rejected() {
        let owner = Keypair::generate();
        let impostor = Keypair::generate();
        let mut key = SessionKey::create(owner.public_key(), scope(), 10);

        let signature = impostor.sign(&key.challenge_message());
        assert!(matches!(
            key.apply_signature(signature),
            Err(SessionError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let owner = Keypair::generate();
        let mut key = SessionKey::create(owner.public_key(), scope(), 10);
        key.apply_signature(owner.sign(&key.challenge_message())).unwrap();

        let serialized = key.export().unwrap();
        let imported = SessionKey::import(&serialized).unwrap();
        assert_eq!(imported, key);
        assert!(imported.is_signed());
    }

    #[test]
    fn test_import_rejects_expired() {
        let owner = Keypair::generate();
        let key = SessionKey::create(owner.public_key(), scope(), 0);
        let serialized = key.export().unwrap();

        let err = SessionKey::import(&serialized).unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(
            SessionKey::import("not hex"),
            Err(SessionError::Serialization(_))
        ));
        assert!(matches!(
            SessionKey::import("deadbeef"),
            Err(SessionError::Serialization(_))
        ));
    }
}
