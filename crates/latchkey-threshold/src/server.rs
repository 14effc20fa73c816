//! Key servers holding polynomial shares.
//!
//! Each server in the quorum stores one share per policy and releases it
//! only after independently verifying the caller's session and current
//! access grant. The grant check is a fresh ledger read on every fetch,
//! so a revoke blocks all future share releases immediately.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use curve25519_dalek::scalar::Scalar;
use zeroize::{Zeroize, ZeroizeOnDrop};

use latchkey_access::{AccessGrant, AccessLevel};
use latchkey_core::now_millis;
use latchkey_ledger::LedgerClient;
use latchkey_session::{SessionError, SessionToken};

use crate::error::{Result, ThresholdError};
use crate::policy::PolicyId;
use crate::shamir::{server_id_to_scalar, SharePoint};

/// One server's share of a policy's secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    /// The holding server's id (its x-coordinate).
    pub server_id: u8,

    /// The share value `f(server_id)`.
    pub value: Scalar,
}

/// A server's answer to a status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStatus {
    /// The responding server's quorum id.
    pub server_id: u8,

    /// How many policies the server currently holds shares for.
    pub policies: usize,
}

impl KeyShare {
    /// View the share as an interpolation point.
    pub fn to_point(&self) -> SharePoint {
        SharePoint {
            x: server_id_to_scalar(self.server_id),
            y: self.value,
        }
    }
}

/// A key-holding server in the quorum.
///
/// Implementations verify sessions and authorization themselves; the
/// engine never vouches for a caller.
#[async_trait]
pub trait KeyServer: Send + Sync {
    /// This server's stable id within the quorum. Never zero.
    fn server_id(&self) -> u8;

    /// Store a share for a policy.
    ///
    /// Re-registering the same policy overwrites the share; policies are
    /// single-use so this only happens when an encrypt is retried.
    async fn register_share(&self, policy: &PolicyId, share: KeyShare) -> Result<()>;

    /// Release the share for a policy.
    ///
    /// The server checks the session token and re-reads the caller's
    /// grant on the policy's asset before releasing anything.
    async fn fetch_share(&self, policy: &PolicyId, token: &SessionToken) -> Result<KeyShare>;

    /// Answer a status probe.
    ///
    /// An error means the server is unreachable or refusing work;
    /// callers use this to check the quorum before starting an
    /// encryption that needs every server.
    async fn status(&self) -> Result<ServerStatus>;
}

/// In-memory key server backed by a ledger client for grant checks.
pub struct MemoryKeyServer {
    server_id: u8,
    ledger: Arc<dyn LedgerClient>,
    shares: RwLock<HashMap<PolicyId, Scalar>>,
}

impl MemoryKeyServer {
    /// Create a server with the given quorum id.
    ///
    /// Panics if `server_id` is zero: the share at x = 0 would be the
    /// secret itself.
    pub fn new(server_id: u8, ledger: Arc<dyn LedgerClient>) -> Self {
        assert!(server_id != 0, "server id 0 is reserved");
        Self {
            server_id,
            ledger,
            shares: RwLock::new(HashMap::new()),
        }
    }

    /// Read the caller's current access level on the asset.
    async fn current_level(&self, policy: &PolicyId, token: &SessionToken) -> Result<AccessLevel> {
        let field = self
            .ledger
            .query_dynamic_field(policy.asset_id, token.owner.as_bytes())
            .await?;
        match field {
            Some(object) => {
                let grant = AccessGrant::from_field(policy.asset_id, &object)
                    .map_err(|e| ThresholdError::ShareRefused(e.to_string()))?;
                Ok(grant.level)
            }
            None => Ok(AccessLevel::NONE),
        }
    }
}

#[async_trait]
impl KeyServer for MemoryKeyServer {
    fn server_id(&self) -> u8 {
        self.server_id
    }

    async fn register_share(&self, policy: &PolicyId, share: KeyShare) -> Result<()> {
        if share.server_id != self.server_id {
            return Err(ThresholdError::ShareRefused(format!(
                "share for server {} sent to server {}",
                share.server_id, self.server_id
            )));
        }
        let mut shares = self.shares.write().unwrap();
        shares.insert(*policy, share.value);
        Ok(())
    }

    async fn fetch_share(&self, policy: &PolicyId, token: &SessionToken) -> Result<KeyShare> {
        token.verify(now_millis()).map_err(|e| match e {
            SessionError::Expired { .. } => ThresholdError::SessionExpired,
            other => ThresholdError::Session(other),
        })?;
        if token.scope != policy.asset_id {
            return Err(ThresholdError::ShareRefused(format!(
                "session scoped to {} cannot decrypt under {}",
                token.scope, policy.asset_id
            )));
        }

        let level = self.current_level(policy, token).await?;
        if !level.can_decrypt() {
            return Err(ThresholdError::ShareRefused(format!(
                "access level {} below decrypt threshold",
                level
            )));
        }

        let value = {
            let shares = self.shares.read().unwrap();
            shares.get(policy).copied()
        };
        match value {
            Some(value) => Ok(KeyShare {
                server_id: self.server_id,
                value,
            }),
            None => Err(ThresholdError::ShareRefused(
                "no share registered for policy".to_string(),
            )),
        }
    }

    async fn status(&self) -> Result<ServerStatus> {
        let shares = self.shares.read().unwrap();
        Ok(ServerStatus {
            server_id: self.server_id,
            policies: shares.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_access::AccessControlManager;
    use latchkey_core::ObjectId;
    use latchkey_ledger::{LocalSigner, MemoryLedger, Signer};
    use latchkey_session::SessionKey;

    async fn granted_setup(level: u8) -> (Arc<MemoryLedger>, LocalSigner, ObjectId) {
        let ledger = Arc::new(MemoryLedger::new());
        let manager = AccessControlManager::new(ledger.clone() as Arc<dyn LedgerClient>);
        let owner = LocalSigner::random();

        let asset = manager.mint_asset(&owner, "asset").await.unwrap();
        let capability = manager
            .create_capability(&owner, asset.id, None)
            .await
            .unwrap();
        manager
            .grant_access(
                &owner,
                capability.id,
                asset.id,
                owner.address(),
                AccessLevel::new(level).unwrap(),
            )
            .await
            .unwrap();
        (ledger, owner, asset.id)
    }

    async fn signed_token(signer: &LocalSigner, scope: ObjectId, ttl_minutes: u32) -> SessionToken {
        let mut key = SessionKey::create(signer.address(), scope, ttl_minutes);
        let signature = signer.sign_message(&key.challenge_message()).await.unwrap();
        key.apply_signature(signature).unwrap();
        SessionToken::from_key(&key).unwrap()
    }

    #[tokio::test]
    async fn test_release_requires_decrypt_level() {
        let (ledger, owner, asset_id) = granted_setup(6).await;
        let server = MemoryKeyServer::new(1, ledger);

        let policy = PolicyId::new(asset_id);
        server
            .register_share(
                &policy,
                KeyShare {
                    server_id: 1,
                    value: Scalar::from(5u64),
                },
            )
            .await
            .unwrap();

        let token = signed_token(&owner, asset_id, 10).await;
        let share = server.fetch_share(&policy, &token).await.unwrap();
        assert_eq!(share.server_id, 1);
        assert_eq!(share.value, Scalar::from(5u64));
    }

    #[tokio::test]
    async fn test_low_level_refused() {
        let (ledger, owner, asset_id) = granted_setup(1).await;
        let server = MemoryKeyServer::new(1, ledger);

        let policy = PolicyId::new(asset_id);
        server
            .register_share(
                &policy,
                KeyShare {
                    server_id: 1,
                    value: Scalar::from(5u64),
                },
            )
            .await
            .unwrap();

        let token = signed_token(&owner, asset_id, 10).await;
        assert!(matches!(
            server.fetch_share(&policy, &token).await,
            Err(ThresholdError::ShareRefused(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_session_refused() {
        let (ledger, owner, asset_id) = granted_setup(6).await;
        let server = MemoryKeyServer::new(1, ledger);
        let policy = PolicyId::new(asset_id);

        let token = signed_token(&owner, asset_id, 0).await;
        assert!(matches!(
            server.fetch_share(&policy, &token).await,
            Err(ThresholdError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_misdirected_share_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let server = MemoryKeyServer::new(2, ledger);

        let policy = PolicyId::new(ObjectId::from_bytes([1; 32]));
        let result = server
            .register_share(
                &policy,
                KeyShare {
                    server_id: 1,
                    value: Scalar::from(5u64),
                },
            )
            .await;
        assert!(matches!(result, Err(ThresholdError::ShareRefused(_))));
    }

    #[tokio::test]
    async fn test_unregistered_policy_refused() {
        let (ledger, owner, asset_id) = granted_setup(6).await;
        let server = MemoryKeyServer::new(1, ledger);

        let token = signed_token(&owner, asset_id, 10).await;
        let policy = PolicyId::new(asset_id);
        assert!(matches!(
            server.fetch_share(&policy, &token).await,
            Err(ThresholdError::ShareRefused(_))
        ));
    }

    #[tokio::test]
    async fn test_status_reports_held_policies() {
        let ledger = Arc::new(MemoryLedger::new());
        let server = MemoryKeyServer::new(3, ledger);

        let status = server.status().await.unwrap();
        assert_eq!(status.server_id, 3);
        assert_eq!(status.policies, 0);

        let policy = PolicyId::new(ObjectId::from_bytes([1; 32]));
        server
            .register_share(
                &policy,
                KeyShare {
                    server_id: 3,
                    value: Scalar::from(9u64),
                },
            )
            .await
            .unwrap();
        assert_eq!(server.status().await.unwrap().policies, 1);
    }
}
