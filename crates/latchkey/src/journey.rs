//! The publishing journey: an ordered, resumable sequence of steps.
//!
//! A journey carries everything the pipeline has produced so far in a
//! [`JourneyData`] record. Whether a step is complete is decided by
//! looking at that record alone; there is no separate progress counter
//! to drift out of sync with the artifacts. Crashing after step four
//! and reloading the journey from the store therefore resumes at step
//! five with no repair pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use latchkey_access::{AccessCapability, AccessGrant, AccessLevel, AssetToken};
use latchkey_blob::StoredBlob;
use latchkey_core::{now_millis, Blake3Hash, BlobId, Ed25519PublicKey, JourneyId};
use latchkey_session::SessionKey;
use latchkey_threshold::{EncryptedPayload, PolicyId};

// ───────────────────────── Steps ─────────────────────────

/// One step of the publishing pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    /// Mint the ownership token for the new asset.
    MintAsset,
    /// Create (or find) the capability to administer grants on it.
    CreateCapability,
    /// Write the requested grant for the grantee.
    GrantAccess,
    /// Re-read the ledger and confirm the grant is effective.
    VerifyAccess,
    /// Fix the encryption policy for the payload.
    InitEncryption,
    /// Create and sign a session key scoped to the asset.
    SignSession,
    /// Pin the payload: digest and size.
    SelectPayload,
    /// Threshold-encrypt the payload under the policy.
    Encrypt,
    /// Upload the ciphertext to blob storage.
    Store,
}

impl StepId {
    /// All steps in execution order.
    pub const ALL: [StepId; 9] = [
        StepId::MintAsset,
        StepId::CreateCapability,
        StepId::GrantAccess,
        StepId::VerifyAccess,
        StepId::InitEncryption,
        StepId::SignSession,
        StepId::SelectPayload,
        StepId::Encrypt,
        StepId::Store,
    ];

    /// Stable machine name, as used in journey state and logs.
    pub fn name(&self) -> &'static str {
        match self {
            StepId::MintAsset => "mint-asset",
            StepId::CreateCapability => "create-capability",
            StepId::GrantAccess => "grant-access",
            StepId::VerifyAccess => "verify-access",
            StepId::InitEncryption => "init-encryption",
            StepId::SignSession => "sign-session",
            StepId::SelectPayload => "select-payload",
            StepId::Encrypt => "encrypt",
            StepId::Store => "store",
        }
    }

    /// Parse a machine name back into a step.
    pub fn from_name(name: &str) -> Option<StepId> {
        StepId::ALL.into_iter().find(|step| step.name() == name)
    }

    /// Position in the pipeline, zero-based.
    pub fn index(&self) -> usize {
        StepId::ALL
            .iter()
            .position(|step| step == self)
            .unwrap_or(0)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ───────────────────────── Journey data ─────────────────────────

/// What the caller asked the pipeline to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Title for the minted asset.
    pub title: String,

    /// The principal being granted access to the published payload.
    pub grantee: Ed25519PublicKey,

    /// The access level to grant.
    pub level: AccessLevel,

    /// The plaintext payload to encrypt and store.
    pub payload: Vec<u8>,
}

/// The payload pinned at select time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSelection {
    /// Blake3 digest of the plaintext.
    pub digest: Blake3Hash,

    /// Plaintext length in bytes.
    pub size_bytes: u64,
}

/// Where the ciphertext ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedBlob {
    /// Content-derived blob address.
    pub blob_id: BlobId,

    /// Last epoch the blob stays certified.
    pub end_epoch: u64,

    /// Gateway URL for fetching the ciphertext.
    pub url: String,
}

impl PublishedBlob {
    /// Build from a store receipt and a gateway URL.
    pub fn new(stored: StoredBlob, url: String) -> Self {
        Self {
            blob_id: stored.blob_id,
            end_epoch: stored.end_epoch,
            url,
        }
    }
}

/// Everything a journey has produced so far.
///
/// Each field maps to exactly one step; a step is complete when its
/// field is populated. Failed step attempts leave the record untouched,
/// so a journey can never claim progress it does not hold the artifacts
/// for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyData {
    /// The original request, immutable for the life of the journey.
    pub request: PublishRequest,

    /// Ownership token from `mint-asset`.
    pub asset: Option<AssetToken>,

    /// Grant-administration capability from `create-capability`.
    pub capability: Option<AccessCapability>,

    /// The written grant from `grant-access`.
    pub grant: Option<AccessGrant>,

    /// The ledger-confirmed level from `verify-access`.
    pub verified_level: Option<AccessLevel>,

    /// Encryption policy from `init-encryption`.
    pub policy: Option<PolicyId>,

    /// Signed session key from `sign-session`.
    pub session: Option<SessionKey>,

    /// Pinned payload digest from `select-payload`.
    pub selection: Option<PayloadSelection>,

    /// Ciphertext from `encrypt`.
    pub encrypted: Option<EncryptedPayload>,

    /// Blob receipt and access URL from `store`.
    pub published: Option<PublishedBlob>,
}

impl JourneyData {
    /// Fresh journey data holding only the request.
    pub fn new(request: PublishRequest) -> Self {
        Self {
            request,
            asset: None,
            capability: None,
            grant: None,
            verified_level: None,
            policy: None,
            session: None,
            selection: None,
            encrypted: None,
            published: None,
        }
    }

    /// Whether `step` has completed.
    ///
    /// A pure function of this record. In particular a session that has
    /// since expired still counts as a completed `sign-session`;
    /// expiry surfaces when the `encrypt` step tries to use it.
    pub fn completed(&self, step: StepId) -> bool {
        match step {
            StepId::MintAsset => self.asset.is_some(),
            StepId::CreateCapability => self.capability.is_some(),
            StepId::GrantAccess => self.grant.is_some(),
            StepId::VerifyAccess => self.verified_level.is_some(),
            StepId::InitEncryption => self.policy.is_some(),
            StepId::SignSession => self.session.as_ref().is_some_and(|s| s.is_signed()),
            StepId::SelectPayload => self.selection.is_some(),
            StepId::Encrypt => self.encrypted.is_some(),
            StepId::Store => self.published.is_some(),
        }
    }
}

// ───────────────────────── Journey ─────────────────────────

/// A publishing journey: request, accumulated artifacts, and the error
/// from the last failed attempt, if any.
///
/// Mutation happens only through the orchestrator; handed-out copies
/// are snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishJourney {
    pub(crate) id: JourneyId,
    pub(crate) data: JourneyData,
    pub(crate) error: Option<String>,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl PublishJourney {
    /// Start a fresh journey for `request`.
    pub fn new(request: PublishRequest) -> Self {
        let now = now_millis();
        Self {
            id: JourneyId::random(),
            data: JourneyData::new(request),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a journey from stored parts.
    pub(crate) fn from_parts(
        id: JourneyId,
        data: JourneyData,
        error: Option<String>,
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            id,
            data,
            error,
            created_at,
            updated_at,
        }
    }

    /// The journey's id.
    pub fn id(&self) -> JourneyId {
        self.id
    }

    /// Accumulated artifacts, including the original request.
    pub fn data(&self) -> &JourneyData {
        &self.data
    }

    /// Message from the most recent failed step attempt.
    ///
    /// Cleared by the next successful step.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// When the journey was started (Unix milliseconds).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// When the journey last changed (Unix milliseconds).
    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Every step paired with its completion status, in order.
    pub fn steps(&self) -> Vec<(StepId, bool)> {
        StepId::ALL
            .into_iter()
            .map(|step| (step, self.data.completed(step)))
            .collect()
    }

    /// The first incomplete step, or `None` when the journey is done.
    ///
    /// Derived from the artifacts on every call, so a journey reloaded
    /// mid-flight resumes at the right place without bookkeeping.
    pub fn current_step(&self) -> Option<StepId> {
        StepId::ALL
            .into_iter()
            .find(|step| !self.data.completed(*step))
    }

    /// Whether every step has completed.
    pub fn is_complete(&self) -> bool {
        self.current_step().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::{from_cbor_bytes, to_canonical_bytes, ObjectId};

    fn request() -> PublishRequest {
        PublishRequest {
            title: "field notes".to_string(),
            grantee: Ed25519PublicKey([7u8; 32]),
            level: AccessLevel::DECRYPT,
            payload: b"payload".to_vec(),
        }
    }

    #[test]
    fn test_step_names_roundtrip() {
        for step in StepId::ALL {
            assert_eq!(StepId::from_name(step.name()), Some(step));
        }
        assert_eq!(StepId::from_name("teleport"), None);
    }

    #[test]
    fn test_step_order() {
        assert_eq!(StepId::MintAsset.index(), 0);
        assert_eq!(StepId::Store.index(), 8);
        for pair in StepId::ALL.windows(2) {
            assert!(pair[0].index() < pair[1].index());
        }
    }

    #[test]
    fn test_new_journey_starts_at_mint() {
        let journey = PublishJourney::new(request());
        assert_eq!(journey.current_step(), Some(StepId::MintAsset));
        assert!(!journey.is_complete());
        assert!(journey.error().is_none());
        assert_eq!(journey.steps().len(), 9);
        assert!(journey.steps().iter().all(|(_, done)| !done));
    }

    #[test]
    fn test_completion_follows_artifacts() {
        let mut data = JourneyData::new(request());
        assert!(!data.completed(StepId::SelectPayload));

        data.selection = Some(PayloadSelection {
            digest: Blake3Hash::hash(b"payload"),
            size_bytes: 7,
        });
        assert!(data.completed(StepId::SelectPayload));

        // Earlier steps are still incomplete; completion is per-field.
        assert!(!data.completed(StepId::MintAsset));
    }

    #[test]
    fn test_unsigned_session_does_not_complete_sign_step() {
        let mut data = JourneyData::new(request());
        let scope = ObjectId::from_bytes([2u8; 32]);
        data.session = Some(SessionKey::create(Ed25519PublicKey([7u8; 32]), scope, 10));
        assert!(!data.completed(StepId::SignSession));
    }

    #[test]
    fn test_current_step_skips_completed_prefix() {
        let mut journey = PublishJourney::new(request());
        journey.data.selection = Some(PayloadSelection {
            digest: Blake3Hash::hash(b"payload"),
            size_bytes: 7,
        });

        // A later artifact does not change which step runs next.
        assert_eq!(journey.current_step(), Some(StepId::MintAsset));
    }

    #[test]
    fn test_journey_serde_roundtrip() {
        let journey = PublishJourney::new(request());
        let bytes = to_canonical_bytes(&journey).unwrap();
        let decoded: PublishJourney = from_cbor_bytes(&bytes).unwrap();
        assert_eq!(decoded, journey);
        assert_eq!(decoded.current_step(), Some(StepId::MintAsset));
    }
}
