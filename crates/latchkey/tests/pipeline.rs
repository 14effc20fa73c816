//! End-to-end pipeline tests: publish, resume, revoke, reconcile.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use latchkey::access::AccessControlManager;
use latchkey::blob::{BlobStatus, BlobStore, MemoryBlobStore, StoredBlob};
use latchkey::ledger::{LedgerClient, LocalSigner, MemoryLedger, Signer};
use latchkey::session::{SessionError, SessionKeyManager};
use latchkey::threshold::{KeyServer, MemoryKeyServer, ThresholdEncryptionEngine, ThresholdError};
use latchkey::{
    AccessLevel, BlobId, EncryptedPayload, JourneyStore, MemoryJourneyStore, OrchestratorConfig,
    PublishError, PublishRequest, PublishingOrchestrator, SqliteJourneyStore, StepId,
};
use latchkey_testkit::{AckDropLedger, TestFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Build an orchestrator over a fixture's components.
fn orchestrator_over(
    fixture: &TestFixture,
    ttl_minutes: u32,
    journeys: Arc<dyn JourneyStore>,
    config: OrchestratorConfig,
) -> PublishingOrchestrator {
    PublishingOrchestrator::new(
        Arc::new(LocalSigner::new(latchkey::Keypair::from_seed(&[0x77; 32]))),
        AccessControlManager::new(fixture.ledger.clone() as Arc<dyn LedgerClient>),
        SessionKeyManager::new(ttl_minutes),
        ThresholdEncryptionEngine::new(fixture.servers.clone()),
        fixture.blob.clone(),
        journeys,
        config,
    )
}

#[tokio::test]
async fn test_full_publish_and_grantee_decrypt() {
    init_tracing();
    let fixture = TestFixture::new(5);
    let reader = LocalSigner::random();
    let payload = vec![0xC3u8; 1024];

    let orch = orchestrator_over(
        &fixture,
        10,
        Arc::new(MemoryJourneyStore::new()),
        OrchestratorConfig::default().with_threshold(2),
    );

    let journey = orch
        .start(PublishRequest {
            title: "field notes".to_string(),
            grantee: reader.address(),
            level: AccessLevel::new(6).unwrap(),
            payload: payload.clone(),
        })
        .await
        .unwrap();

    // Each advance runs exactly the next step, in pipeline order.
    for expected in StepId::ALL {
        let state = orch.get_state(journey.id()).await.unwrap();
        assert_eq!(state.current_step(), Some(expected));
        orch.advance(journey.id()).await.unwrap();
    }

    let state = orch.get_state(journey.id()).await.unwrap();
    assert!(state.is_complete());
    assert!(state.error().is_none());

    let data = state.data();
    let asset = data.asset.as_ref().unwrap();
    let selection = data.selection.as_ref().unwrap();
    assert_eq!(selection.size_bytes, 1024);
    assert_eq!(selection.digest, latchkey::Blake3Hash::hash(&payload));

    // The stored blob decodes back into the encrypted payload.
    let published = data.published.as_ref().unwrap();
    let fetched = fixture.blob.download(published.blob_id).await.unwrap();
    let decoded = EncryptedPayload::from_bytes(&fetched).unwrap();
    assert_eq!(&decoded, data.encrypted.as_ref().unwrap());
    assert!(published.url.ends_with(&published.blob_id.to_hex()));

    // The grantee holds level 6 and can decrypt with its own session.
    let session = fixture.signed_session(&reader, asset.id, 10).await.unwrap();
    let plaintext = orch.engine().decrypt(&decoded, &session).await.unwrap();
    assert_eq!(plaintext, payload);
}

#[tokio::test]
async fn test_journey_resumes_after_restart() {
    init_tracing();
    let fixture = TestFixture::new(5);
    let reader = LocalSigner::random();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journeys.db");

    let journey_id = {
        let store = Arc::new(SqliteJourneyStore::open(&path).unwrap());
        let orch = orchestrator_over(&fixture, 10, store, OrchestratorConfig::default());
        let journey = orch
            .start(PublishRequest {
                title: "interrupted".to_string(),
                grantee: reader.address(),
                level: AccessLevel::DECRYPT,
                payload: b"resume me".to_vec(),
            })
            .await
            .unwrap();

        // Run the four access-control steps, then "crash".
        for step in &StepId::ALL[..4] {
            orch.run_step(journey.id(), *step).await.unwrap();
        }
        journey.id()
    };

    // A new process over the same store picks up where the data stops.
    let store = Arc::new(SqliteJourneyStore::open(&path).unwrap());
    let orch = orchestrator_over(&fixture, 10, store, OrchestratorConfig::default());

    let state = orch.get_state(journey_id).await.unwrap();
    assert_eq!(state.current_step(), Some(StepId::InitEncryption));
    assert!(state.data().asset.is_some());
    assert!(state.data().verified_level.is_some());
    assert!(state.data().policy.is_none());

    let advanced = orch.advance(journey_id).await.unwrap();
    assert!(advanced.data().policy.is_some());
    assert_eq!(advanced.current_step(), Some(StepId::SignSession));

    while !orch.get_state(journey_id).await.unwrap().is_complete() {
        orch.advance(journey_id).await.unwrap();
    }
    assert!(orch
        .get_state(journey_id)
        .await
        .unwrap()
        .data()
        .published
        .is_some());
}

#[tokio::test]
async fn test_revoked_grantee_cannot_decrypt() {
    init_tracing();
    let fixture = TestFixture::new(3);
    let reader = LocalSigner::random();

    let orch = orchestrator_over(
        &fixture,
        10,
        Arc::new(MemoryJourneyStore::new()),
        OrchestratorConfig::default(),
    );

    let journey = orch
        .start(PublishRequest {
            title: "revocable".to_string(),
            grantee: reader.address(),
            level: AccessLevel::DECRYPT,
            payload: b"short-lived access".to_vec(),
        })
        .await
        .unwrap();
    for _ in StepId::ALL {
        orch.advance(journey.id()).await.unwrap();
    }

    let state = orch.get_state(journey.id()).await.unwrap();
    let asset_id = state.data().asset.as_ref().unwrap().id;
    let encrypted = state.data().encrypted.as_ref().unwrap().clone();

    // Before revocation the grantee decrypts fine.
    let session = fixture.signed_session(&reader, asset_id, 10).await.unwrap();
    assert!(orch.engine().decrypt(&encrypted, &session).await.is_ok());

    assert!(orch.revoke_access(asset_id, reader.address()).await.unwrap());

    // Key servers read the ledger fresh, so the same session now fails.
    let err = orch.engine().decrypt(&encrypted, &session).await.unwrap_err();
    assert!(matches!(err, ThresholdError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_expired_session_blocks_encrypt() {
    init_tracing();
    let fixture = TestFixture::new(3);
    let reader = LocalSigner::random();

    // Zero TTL: sessions are expired the instant they are signed.
    let orch = orchestrator_over(
        &fixture,
        0,
        Arc::new(MemoryJourneyStore::new()),
        OrchestratorConfig::default(),
    );

    let journey = orch
        .start(PublishRequest {
            title: "stale".to_string(),
            grantee: reader.address(),
            level: AccessLevel::DECRYPT,
            payload: b"never encrypted".to_vec(),
        })
        .await
        .unwrap();

    for _ in 0..StepId::Encrypt.index() {
        orch.advance(journey.id()).await.unwrap();
    }

    let err = orch.advance(journey.id()).await.unwrap_err();
    assert!(matches!(
        err,
        PublishError::Session(SessionError::Expired { .. })
    ));
    assert!(!err.is_retryable());

    // The failure is recorded, nothing was lost, nothing progressed.
    let state = orch.get_state(journey.id()).await.unwrap();
    assert!(state.error().is_some());
    assert_eq!(state.current_step(), Some(StepId::Encrypt));
    assert!(state.data().session.is_some());
    assert!(state.data().encrypted.is_none());
}

#[tokio::test]
async fn test_transient_ledger_failure_reconciles_on_retry() {
    init_tracing();
    let ledger = Arc::new(MemoryLedger::new());
    let faulty = Arc::new(AckDropLedger::new(ledger.clone() as Arc<dyn LedgerClient>));
    let servers: Vec<Arc<dyn KeyServer>> = (1..=3u8)
        .map(|id| {
            Arc::new(MemoryKeyServer::new(id, ledger.clone() as Arc<dyn LedgerClient>))
                as Arc<dyn KeyServer>
        })
        .collect();
    let reader = LocalSigner::random();

    let orch = PublishingOrchestrator::new(
        Arc::new(LocalSigner::random()),
        AccessControlManager::new(faulty.clone() as Arc<dyn LedgerClient>),
        SessionKeyManager::new(10),
        ThresholdEncryptionEngine::new(servers),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(MemoryJourneyStore::new()),
        OrchestratorConfig::default(),
    );

    let journey = orch
        .start(PublishRequest {
            title: "flaky".to_string(),
            grantee: reader.address(),
            level: AccessLevel::DECRYPT,
            payload: b"eventually published".to_vec(),
        })
        .await
        .unwrap();
    orch.run_step(journey.id(), StepId::MintAsset).await.unwrap();

    // The capability write commits but its acknowledgement is lost.
    faulty.drop_next_acks(1);
    let err = orch
        .run_step(journey.id(), StepId::CreateCapability)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let state = orch.get_state(journey.id()).await.unwrap();
    assert!(state.error().is_some());
    assert_eq!(state.current_step(), Some(StepId::CreateCapability));

    // Retrying reads before writing, so no duplicate capability.
    orch.run_step(journey.id(), StepId::CreateCapability)
        .await
        .unwrap();
    let capabilities = orch
        .manager()
        .list_capabilities(&orch.publisher())
        .await
        .unwrap();
    assert_eq!(capabilities.len(), 1);

    let state = orch.get_state(journey.id()).await.unwrap();
    assert!(state.error().is_none());
    assert_eq!(state.current_step(), Some(StepId::GrantAccess));
}

// ───────────────────────── Single-flight ─────────────────────────

/// Blob store whose upload blocks until released, to hold a journey
/// mid-step.
struct StallingBlobStore {
    inner: MemoryBlobStore,
    entered: Notify,
    gate: Notify,
}

impl StallingBlobStore {
    fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }
}

#[async_trait]
impl BlobStore for StallingBlobStore {
    async fn upload(&self, bytes: Bytes, retention_epochs: u64) -> latchkey::blob::Result<StoredBlob> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.upload(bytes, retention_epochs).await
    }

    async fn download(&self, blob_id: BlobId) -> latchkey::blob::Result<Vec<u8>> {
        self.inner.download(blob_id).await
    }

    async fn status(&self, blob_id: BlobId) -> latchkey::blob::Result<BlobStatus> {
        self.inner.status(blob_id).await
    }
}

#[tokio::test]
async fn test_concurrent_step_is_rejected() {
    init_tracing();
    let fixture = TestFixture::new(3);
    let reader = LocalSigner::random();
    let blob = Arc::new(StallingBlobStore::new());

    let orch = Arc::new(PublishingOrchestrator::new(
        Arc::new(LocalSigner::random()),
        AccessControlManager::new(fixture.ledger.clone() as Arc<dyn LedgerClient>),
        SessionKeyManager::new(10),
        ThresholdEncryptionEngine::new(fixture.servers.clone()),
        blob.clone(),
        Arc::new(MemoryJourneyStore::new()),
        OrchestratorConfig::default(),
    ));

    let journey = orch
        .start(PublishRequest {
            title: "contended".to_string(),
            grantee: reader.address(),
            level: AccessLevel::DECRYPT,
            payload: b"one at a time".to_vec(),
        })
        .await
        .unwrap();

    for _ in 0..StepId::Store.index() {
        orch.advance(journey.id()).await.unwrap();
    }

    // First caller claims the store step and stalls inside upload.
    let background = {
        let orch = orch.clone();
        let id = journey.id();
        tokio::spawn(async move { orch.advance(id).await })
    };
    blob.entered.notified().await;

    let err = orch.advance(journey.id()).await.unwrap_err();
    assert!(matches!(err, PublishError::StepInProgress(_)));

    // Release the first caller; the journey completes normally.
    blob.gate.notify_one();
    background.await.unwrap().unwrap();
    assert!(orch.get_state(journey.id()).await.unwrap().is_complete());
}

#[tokio::test]
async fn test_listed_journeys_cover_the_store() {
    init_tracing();
    let fixture = TestFixture::new(2);
    let reader = LocalSigner::random();
    let orch = orchestrator_over(
        &fixture,
        10,
        Arc::new(MemoryJourneyStore::new()),
        OrchestratorConfig::default(),
    );

    let first = orch
        .start(PublishRequest {
            title: "one".to_string(),
            grantee: reader.address(),
            level: AccessLevel::VIEW,
            payload: b"1".to_vec(),
        })
        .await
        .unwrap();
    let second = orch
        .start(PublishRequest {
            title: "two".to_string(),
            grantee: reader.address(),
            level: AccessLevel::VIEW,
            payload: b"2".to_vec(),
        })
        .await
        .unwrap();

    let ids = orch.list_journeys().await.unwrap();
    assert!(ids.contains(&first.id()));
    assert!(ids.contains(&second.id()));
}
