//! Portable proof of a signed session.
//!
//! A [`SessionToken`] carries everything a key server needs to check a
//! session on its own: the owner, the scope, the expiry, and the owner's
//! signature binding them together. Unlike [`SessionKey`], it is a plain
//! record with no state transitions.

use serde::{Deserialize, Serialize};

use latchkey_core::{Ed25519PublicKey, Ed25519Signature, ObjectId};

use crate::error::{Result, SessionError};
use crate::key::{challenge_bytes, SessionKey};

/// Self-contained proof that a principal holds a signed, unexpired
/// session for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// The session owner.
    pub owner: Ed25519PublicKey,

    /// The asset the session is scoped to.
    pub scope: ObjectId,

    /// The session key's creation nonce.
    pub nonce: [u8; 32],

    /// When the session expires (Unix milliseconds).
    pub expires_at: i64,

    /// The owner's signature over the session challenge.
    pub signature: Ed25519Signature,
}

impl SessionToken {
    /// Build a token from a signed session key.
    ///
    /// Fails with [`SessionError::NotSigned`] if the key has no
    /// signature yet.
    pub fn from_key(key: &SessionKey) -> Result<Self> {
        let signature = key.signature().copied().ok_or(SessionError::NotSigned)?;
        Ok(Self {
            owner: *key.owner(),
            scope: key.scope(),
            nonce: *key.nonce(),
            expires_at: key.expires_at(),
            signature,
        })
    }

    /// Verify the token at time `now`.
    ///
    /// Checks expiry first, then that the signature covers exactly the
    /// fields the token presents. A token whose fields were altered
    /// after signing fails with [`SessionError::SignatureMismatch`].
    pub fn verify(&self, now: i64) -> Result<()> {
        if now >= self.expires_at {
            return Err(SessionError::Expired {
                expires_at: self.expires_at,
            });
        }
        let message = challenge_bytes(&self.owner, &self.scope, &self.nonce, self.expires_at);
        self.owner
            .verify(&message, &self.signature)
            .map_err(|_| SessionError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::{now_millis, Keypair};

    fn signed_key(owner: &Keypair, ttl_minutes: u32) -> SessionKey {
        let mut key = SessionKey::create(owner.public_key(), ObjectId::from_bytes([0x11; 32]), ttl_minutes);
        key.apply_signature(owner.sign(&key.challenge_message())).unwrap();
        key
    }

    #[test]
    fn test_token_requires_signed_key() {
        let owner = Keypair::generate();
        let key = SessionKey::create(owner.public_key(), ObjectId::from_bytes([0x11; 32]), 10);

        assert!(matches!(
            SessionToken::from_key(&key),
            Err(SessionError::NotSigned)
        ));
    }

    #[test]
    fn test_token_verifies() {
        let owner = Keypair::generate();
        let key = signed_key(&owner, 10);

        let token = SessionToken::from_key(&key).unwrap();
        token.verify(now_millis()).unwrap();
    }

    #[test]
    fn test_tampered_token_rejected() {
        let owner = Keypair::generate();
        let key = signed_key(&owner, 10);

        // Re-pointing the token at a different asset breaks the signature.
        let mut token = SessionToken::from_key(&key).unwrap();
        token.scope = ObjectId::from_bytes([0x22; 32]);
        assert!(matches!(
            token.verify(now_millis()),
            Err(SessionError::SignatureMismatch)
        ));

        // So does stretching the expiry.
        let mut token = SessionToken::from_key(&key).unwrap();
        token.expires_at += 60_000;
        assert!(matches!(
            token.verify(now_millis()),
            Err(SessionError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let owner = Keypair::generate();
        let key = signed_key(&owner, 0);

        let token = SessionToken::from_key(&key).unwrap();
        assert!(matches!(
            token.verify(now_millis()),
            Err(SessionError::Expired { .. })
        ));
    }
}
