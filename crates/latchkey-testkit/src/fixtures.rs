//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: one ledger, one access
//! manager, and an n-server encryption quorum, all sharing state the
//! way a deployment would.

use std::sync::Arc;

use latchkey_access::{AccessControlManager, AccessGrant, AccessLevel, AssetToken};
use latchkey_blob::MemoryBlobStore;
use latchkey_core::{Ed25519PublicKey, Keypair, ObjectId};
use latchkey_ledger::{LedgerClient, LocalSigner, MemoryLedger, Signer};
use latchkey_session::SessionKey;
use latchkey_threshold::{KeyServer, MemoryKeyServer, ThresholdEncryptionEngine};

/// A full set of pipeline components over one in-memory ledger.
///
/// The key servers authorize against the same ledger the access
/// manager writes to, so grants made through `manager` are immediately
/// visible to `engine` decryptions.
pub struct TestFixture {
    /// The shared ledger.
    pub ledger: Arc<MemoryLedger>,
    /// Access manager bound to the ledger.
    pub manager: AccessControlManager,
    /// Threshold engine over `servers`.
    pub engine: ThresholdEncryptionEngine,
    /// The quorum, ids `1..=n`.
    pub servers: Vec<Arc<dyn KeyServer>>,
    /// In-memory blob store.
    pub blob: Arc<MemoryBlobStore>,
    /// The publishing principal.
    pub owner: LocalSigner,
}

impl TestFixture {
    /// Create a fixture with a random owner and `server_count` key
    /// servers.
    pub fn new(server_count: u8) -> Self {
        Self::build(LocalSigner::random(), server_count)
    }

    /// Create with a deterministic owner keypair from seed.
    pub fn with_seed(seed: [u8; 32], server_count: u8) -> Self {
        Self::build(LocalSigner::new(Keypair::from_seed(&seed)), server_count)
    }

    fn build(owner: LocalSigner, server_count: u8) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let manager = AccessControlManager::new(ledger.clone() as Arc<dyn LedgerClient>);
        let servers: Vec<Arc<dyn KeyServer>> = (1..=server_count)
            .map(|id| {
                Arc::new(MemoryKeyServer::new(id, ledger.clone() as Arc<dyn LedgerClient>))
                    as Arc<dyn KeyServer>
            })
            .collect();
        let engine = ThresholdEncryptionEngine::new(servers.clone());

        Self {
            ledger,
            manager,
            engine,
            servers,
            blob: Arc::new(MemoryBlobStore::new()),
            owner,
        }
    }

    /// The owner's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.owner.address()
    }

    /// Mint an asset owned by the fixture's owner.
    pub async fn mint(&self, title: &str) -> latchkey_access::Result<AssetToken> {
        self.manager.mint_asset(&self.owner, title).await
    }

    /// Grant `grantee` a level on an asset, creating a capability for
    /// the owner if needed.
    pub async fn grant(
        &self,
        asset_id: ObjectId,
        grantee: Ed25519PublicKey,
        level: AccessLevel,
    ) -> latchkey_access::Result<AccessGrant> {
        let capability = self
            .manager
            .find_or_create_capability(&self.owner, asset_id)
            .await?;
        self.manager
            .grant_access(&self.owner, capability.id, asset_id, grantee, level)
            .await
    }

    /// Create and sign a session key for `signer` over `scope`.
    pub async fn signed_session(
        &self,
        signer: &LocalSigner,
        scope: ObjectId,
        ttl_minutes: u32,
    ) -> latchkey_session::Result<SessionKey> {
        let mut key = SessionKey::create(signer.address(), scope, ttl_minutes);
        let signature = signer.sign_message(&key.challenge_message()).await?;
        key.apply_signature(signature)?;
        Ok(key)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Create distinct deterministic signers for multi-party tests.
pub fn multi_party_signers(count: usize) -> Vec<LocalSigner> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0x5A;
            LocalSigner::new(Keypair::from_seed(&seed))
        })
        .collect()
}
