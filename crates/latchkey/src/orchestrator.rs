//! The publishing orchestrator.
//!
//! Drives journeys through the pipeline one step at a time. The
//! orchestrator owns no authority of its own: the ledger is the source
//! of truth for authorization, the key servers for decryption approval,
//! and the journey's own artifacts for progress. What it adds is
//! sequencing, single-flight execution per journey, and persistence of
//! every completed step.
//!
//! # Failure handling
//!
//! A failed step leaves the journey's data exactly as it was; only the
//! error message is updated. Nothing is rolled back automatically.
//! Steps that write to the ledger reconcile by reading first, so
//! retrying after an ambiguous transport failure never duplicates
//! on-ledger state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;

use latchkey_access::{AccessControlManager, AccessError, AccessGrant, AccessLevel};
use latchkey_blob::BlobStore;
use latchkey_core::{now_millis, Blake3Hash, BlobId, Ed25519PublicKey, JourneyId, ObjectId};
use latchkey_ledger::Signer;
use latchkey_session::{SessionError, SessionKeyManager};
use latchkey_threshold::{PolicyId, ThresholdEncryptionEngine};

use crate::config::OrchestratorConfig;
use crate::error::{PublishError, Result};
use crate::journey::{
    JourneyData, PayloadSelection, PublishJourney, PublishRequest, PublishedBlob, StepId,
};
use crate::store::JourneyStore;

/// A live journey plus its execution flag.
struct Slot {
    journey: PublishJourney,
    /// Set while a step is executing; enforces single-flight.
    in_flight: bool,
}

/// Coordinates the full publish pipeline over injected components.
pub struct PublishingOrchestrator {
    signer: Arc<dyn Signer>,
    manager: AccessControlManager,
    sessions: SessionKeyManager,
    engine: ThresholdEncryptionEngine,
    blob: Arc<dyn BlobStore>,
    store: Arc<dyn JourneyStore>,
    config: OrchestratorConfig,
    journeys: RwLock<HashMap<JourneyId, Slot>>,
}

impl PublishingOrchestrator {
    /// Build an orchestrator over the given components.
    ///
    /// All journeys started or resumed here act as `signer`'s principal:
    /// it owns minted assets, holds capabilities, and signs sessions.
    pub fn new(
        signer: Arc<dyn Signer>,
        manager: AccessControlManager,
        sessions: SessionKeyManager,
        engine: ThresholdEncryptionEngine,
        blob: Arc<dyn BlobStore>,
        store: Arc<dyn JourneyStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            signer,
            manager,
            sessions,
            engine,
            blob,
            store,
            config,
            journeys: RwLock::new(HashMap::new()),
        }
    }

    /// The principal this orchestrator publishes as.
    pub fn publisher(&self) -> Ed25519PublicKey {
        self.signer.address()
    }

    /// The access-control manager, for direct grant administration.
    pub fn manager(&self) -> &AccessControlManager {
        &self.manager
    }

    /// The session key manager.
    pub fn sessions(&self) -> &SessionKeyManager {
        &self.sessions
    }

    /// The threshold encryption engine.
    pub fn engine(&self) -> &ThresholdEncryptionEngine {
        &self.engine
    }

    /// The orchestrator's configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ───────────────────────── Journey lifecycle ─────────────────────────

    /// Start a new journey for `request` and persist it.
    ///
    /// No step runs yet; call [`advance`](Self::advance) to make
    /// progress.
    pub async fn start(&self, request: PublishRequest) -> Result<PublishJourney> {
        let journey = PublishJourney::new(request);
        self.store.save(&journey).await?;

        let mut journeys = self.journeys.write().unwrap();
        journeys.insert(
            journey.id(),
            Slot {
                journey: journey.clone(),
                in_flight: false,
            },
        );
        tracing::debug!(journey = %journey.id(), "journey started");
        Ok(journey)
    }

    /// A snapshot of the journey's current state.
    ///
    /// Unknown ids are looked up in the store, so journeys persisted by
    /// an earlier process are visible here without an explicit import.
    pub async fn get_state(&self, id: JourneyId) -> Result<PublishJourney> {
        self.ensure_loaded(id).await?;
        let journeys = self.journeys.read().unwrap();
        let slot = journeys.get(&id).ok_or(PublishError::JourneyNotFound(id))?;
        Ok(slot.journey.clone())
    }

    /// Ids of every journey in the store, oldest first.
    pub async fn list_journeys(&self) -> Result<Vec<JourneyId>> {
        Ok(self.store.list_ids().await?)
    }

    /// Run the journey's next incomplete step.
    ///
    /// The next step is derived from the journey's artifacts, never
    /// from a stored cursor: a journey reloaded after a crash advances
    /// from wherever its data says it stopped.
    pub async fn advance(&self, id: JourneyId) -> Result<PublishJourney> {
        self.execute(id, None).await
    }

    /// Run exactly `step`, which must be the next incomplete step.
    ///
    /// Anything else fails with [`PublishError::StepOutOfOrder`],
    /// including steps that already completed.
    pub async fn run_step(&self, id: JourneyId, step: StepId) -> Result<PublishJourney> {
        self.execute(id, Some(step)).await
    }

    // ───────────────────────── Access facade ─────────────────────────

    /// Grant `grantee` the given level on an asset owned by this
    /// publisher, creating a capability if needed.
    pub async fn grant_access(
        &self,
        asset_id: ObjectId,
        grantee: Ed25519PublicKey,
        level: AccessLevel,
    ) -> Result<AccessGrant> {
        let capability = self
            .manager
            .find_or_create_capability(self.signer.as_ref(), asset_id)
            .await?;
        Ok(self
            .manager
            .grant_access(self.signer.as_ref(), capability.id, asset_id, grantee, level)
            .await?)
    }

    /// Revoke `grantee`'s grant on an asset.
    ///
    /// Returns `false` when there was nothing to revoke, including when
    /// this publisher holds no capability for the asset.
    pub async fn revoke_access(
        &self,
        asset_id: ObjectId,
        grantee: Ed25519PublicKey,
    ) -> Result<bool> {
        let capability = match self
            .manager
            .find_capability(&self.signer.address(), asset_id)
            .await?
        {
            Some(capability) => capability,
            None => return Ok(false),
        };
        Ok(self
            .manager
            .revoke_access(self.signer.as_ref(), capability.id, asset_id, grantee)
            .await?)
    }

    /// `grantee`'s current level on an asset, read fresh from the
    /// ledger.
    pub async fn get_access_level(
        &self,
        asset_id: ObjectId,
        grantee: &Ed25519PublicKey,
    ) -> Result<AccessLevel> {
        Ok(self.manager.get_access_level(asset_id, grantee).await?)
    }

    // ───────────────────────── Step execution ─────────────────────────

    /// Claim the journey, run one step, merge the result.
    async fn execute(&self, id: JourneyId, requested: Option<StepId>) -> Result<PublishJourney> {
        self.ensure_loaded(id).await?;

        // Claim under the write lock: one step per journey at a time.
        let (step, journey) = {
            let mut journeys = self.journeys.write().unwrap();
            let slot = journeys.get_mut(&id).ok_or(PublishError::JourneyNotFound(id))?;

            if slot.in_flight {
                return Err(PublishError::StepInProgress(id));
            }
            let next = slot
                .journey
                .current_step()
                .ok_or(PublishError::JourneyComplete(id))?;
            if let Some(requested) = requested {
                if requested != next {
                    return Err(PublishError::StepOutOfOrder {
                        expected: next,
                        requested,
                    });
                }
            }
            slot.in_flight = true;
            (next, slot.journey.clone())
        };

        let updated = match self.perform(step, &journey.data).await {
            Ok(data) => {
                let mut updated = journey;
                updated.data = data;
                updated.error = None;
                updated.updated_at = now_millis();
                if let Err(e) = self.store.save(&updated).await {
                    self.release_failed(id, &e.to_string());
                    return Err(e.into());
                }
                updated
            }
            Err(e) => {
                tracing::debug!(journey = %id, step = %step, error = %e, "step failed");
                self.release_failed(id, &e.to_string());
                return Err(e);
            }
        };

        let mut journeys = self.journeys.write().unwrap();
        if let Some(slot) = journeys.get_mut(&id) {
            slot.journey = updated.clone();
            slot.in_flight = false;
        }
        tracing::debug!(journey = %id, step = %step, "step completed");
        Ok(updated)
    }

    /// Read-through from the store into the live map.
    async fn ensure_loaded(&self, id: JourneyId) -> Result<()> {
        if self.journeys.read().unwrap().contains_key(&id) {
            return Ok(());
        }
        let journey = self
            .store
            .load(id)
            .await?
            .ok_or(PublishError::JourneyNotFound(id))?;

        let mut journeys = self.journeys.write().unwrap();
        journeys.entry(id).or_insert(Slot {
            journey,
            in_flight: false,
        });
        Ok(())
    }

    /// Record a failed attempt and release the execution flag.
    ///
    /// Only the error message changes; the journey's data stays as it
    /// was, so the failed step remains the next one to run.
    fn release_failed(&self, id: JourneyId, message: &str) {
        let mut journeys = self.journeys.write().unwrap();
        if let Some(slot) = journeys.get_mut(&id) {
            slot.journey.error = Some(message.to_string());
            slot.journey.updated_at = now_millis();
            slot.in_flight = false;
        }
    }

    /// Run one step against a snapshot of the journey's data and return
    /// the data with the step's artifact merged in.
    async fn perform(&self, step: StepId, data: &JourneyData) -> Result<JourneyData> {
        let mut data = data.clone();
        match step {
            StepId::MintAsset => {
                let asset = self
                    .manager
                    .mint_asset(self.signer.as_ref(), &data.request.title)
                    .await?;
                data.asset = Some(asset);
            }

            StepId::CreateCapability => {
                let asset = require(&data.asset, "asset")?;
                // find_or_create reconciles: a capability minted by an
                // earlier attempt whose ack was lost gets reused.
                let capability = self
                    .manager
                    .find_or_create_capability(self.signer.as_ref(), asset.id)
                    .await?;
                data.capability = Some(capability);
            }

            StepId::GrantAccess => {
                let asset = require(&data.asset, "asset")?;
                let capability = require(&data.capability, "capability")?;
                let existing = self
                    .manager
                    .get_grant(asset.id, &data.request.grantee)
                    .await?;
                let grant = match existing {
                    // An earlier attempt already landed this grant.
                    Some(grant) if grant.level == data.request.level => grant,
                    _ => {
                        self.manager
                            .grant_access(
                                self.signer.as_ref(),
                                capability.id,
                                asset.id,
                                data.request.grantee,
                                data.request.level,
                            )
                            .await?
                    }
                };
                data.grant = Some(grant);
            }

            StepId::VerifyAccess => {
                let asset = require(&data.asset, "asset")?;
                let level = self
                    .manager
                    .get_access_level(asset.id, &data.request.grantee)
                    .await?;
                if !level.allows(data.request.level) {
                    return Err(AccessError::Unauthorized(format!(
                        "grantee holds level {}, journey requires {}",
                        level.value(),
                        data.request.level.value()
                    ))
                    .into());
                }
                data.verified_level = Some(level);
            }

            StepId::InitEncryption => {
                let asset = require(&data.asset, "asset")?;
                self.engine.check_threshold(self.config.quorum.threshold)?;
                // Every server must accept a share later, so an
                // unreachable one fails the step here instead of
                // mid-encrypt.
                self.engine.preflight().await?;
                data.policy = Some(PolicyId::new(asset.id));
            }

            StepId::SignSession => {
                let asset = require(&data.asset, "asset")?;
                let session = self
                    .sessions
                    .sign_session(self.signer.as_ref(), asset.id)
                    .await?;
                data.session = Some(session);
            }

            StepId::SelectPayload => {
                if data.request.payload.is_empty() {
                    return Err(PublishError::InvalidOperation(
                        "cannot publish an empty payload".to_string(),
                    ));
                }
                data.selection = Some(PayloadSelection {
                    digest: Blake3Hash::hash(&data.request.payload),
                    size_bytes: data.request.payload.len() as u64,
                });
            }

            StepId::Encrypt => {
                let policy = *require(&data.policy, "encryption policy")?;
                let session = require(&data.session, "session key")?;
                // An expired session fails the step but stays in the
                // journey, so the state still shows what was signed.
                if session.is_expired(now_millis()) {
                    return Err(SessionError::Expired {
                        expires_at: session.expires_at(),
                    }
                    .into());
                }
                let encrypted = self
                    .engine
                    .encrypt(&data.request.payload, policy, self.config.quorum.threshold)
                    .await?;
                data.encrypted = Some(encrypted);
            }

            StepId::Store => {
                let encrypted = require(&data.encrypted, "encrypted payload")?;
                let bytes = Bytes::from(encrypted.to_bytes());
                let stored = self
                    .blob
                    .upload(bytes, self.config.blob.retention_epochs)
                    .await?;
                let url = self.blob_url(stored.blob_id);
                tracing::debug!(blob = %stored.blob_id, url = %url, "ciphertext stored");
                data.published = Some(PublishedBlob::new(stored, url));
            }
        }
        Ok(data)
    }

    fn blob_url(&self, blob_id: BlobId) -> String {
        format!(
            "{}/v1/blobs/{}",
            self.config.blob.gateway_url.trim_end_matches('/'),
            blob_id.to_hex()
        )
    }
}

/// Fetch an artifact an earlier step should have produced.
fn require<'a, T>(value: &'a Option<T>, what: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| {
        PublishError::InvalidOperation(format!("{} not yet produced", what))
    })
}
