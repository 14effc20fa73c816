//! Session creation bound to a signer.

use latchkey_core::ObjectId;
use latchkey_ledger::Signer;

use crate::error::Result;
use crate::key::SessionKey;

/// Creates and signs session keys with a fixed TTL policy.
///
/// The manager holds no key material; each signing round-trips through
/// the caller's [`Signer`].
pub struct SessionKeyManager {
    ttl_minutes: u32,
}

impl SessionKeyManager {
    /// Create a manager that mints keys valid for `ttl_minutes`.
    pub fn new(ttl_minutes: u32) -> Self {
        Self { ttl_minutes }
    }

    /// The TTL applied to new keys.
    pub fn ttl_minutes(&self) -> u32 {
        self.ttl_minutes
    }

    /// Create an unsigned key for `owner`, scoped to one asset.
    pub fn create(&self, owner: latchkey_core::Ed25519PublicKey, scope: ObjectId) -> SessionKey {
        SessionKey::create(owner, scope, self.ttl_minutes)
    }

    /// Create a key for the signer's address and have the signer sign
    /// its challenge.
    pub async fn sign_session(&self, signer: &dyn Signer, scope: ObjectId) -> Result<SessionKey> {
        let mut key = self.create(signer.address(), scope);
        let signature = signer.sign_message(&key.challenge_message()).await?;
        key.apply_signature(signature)?;
        tracing::debug!(scope = %scope, expires_at = key.expires_at(), "session signed");
        Ok(key)
    }
}
