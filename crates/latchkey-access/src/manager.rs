//! High-level access-control operations.
//!
//! [`AccessControlManager`] wraps a [`LedgerClient`] and exposes the
//! grant/revoke lifecycle in domain terms. It validates capabilities
//! against a fresh read before submitting, decodes effects into domain
//! types, and reconciles ambiguous outcomes by re-reading ledger state.

use std::sync::Arc;

use latchkey_core::{now_millis, Ed25519PublicKey, ObjectId, ObjectKind};
use latchkey_ledger::{
    entry, LedgerCall, LedgerClient, LedgerError, RejectReason, Signer,
};

use crate::error::{AccessError, Result};
use crate::level::AccessLevel;
use crate::store::CapabilityStore;
use crate::types::{AccessCapability, AccessGrant, AssetToken};

/// Map a rejection of a capability-authorized submission (grant, revoke)
/// onto the domain error taxonomy.
///
/// Holder and expiry failures both mean "you may not do this"; everything
/// else keeps its ledger shape. Calls whose authority is plain object
/// ownership, like capability creation, surface their rejections
/// untranslated.
fn map_authorization(err: LedgerError) -> AccessError {
    match err.reject_reason() {
        Some(RejectReason::NotOwner) | Some(RejectReason::Expired) => {
            AccessError::Unauthorized(err.to_string())
        }
        Some(RejectReason::NotFound) => AccessError::NotFound(err.to_string()),
        _ => AccessError::Ledger(err),
    }
}

/// Manages assets, capabilities, and grants on the ledger.
pub struct AccessControlManager {
    ledger: Arc<dyn LedgerClient>,
}

impl AccessControlManager {
    /// Create a manager backed by the given ledger client.
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// The underlying ledger client.
    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    // ───── Writes ─────

    /// Mint an ownership token for a new asset.
    pub async fn mint_asset(&self, signer: &dyn Signer, title: &str) -> Result<AssetToken> {
        let call = LedgerCall::new(entry::ASSET_MINT).text(title);
        let effects = self.ledger.submit_call(&call, signer).await?;

        let object = effects.first_created_of(ObjectKind::Asset).ok_or_else(|| {
            AccessError::InvalidObject("mint effects carried no asset".into())
        })?;
        let token = AssetToken::from_object(object)?;
        tracing::debug!(asset = %token.id, "minted asset token");
        Ok(token)
    }

    /// Create a capability to administer grants on an owned asset.
    ///
    /// Only the current asset owner can do this; `expires_at` bounds the
    /// capability's lifetime in Unix milliseconds.
    pub async fn create_capability(
        &self,
        signer: &dyn Signer,
        asset_id: ObjectId,
        expires_at: Option<i64>,
    ) -> Result<AccessCapability> {
        let mut call = LedgerCall::new(entry::CAPABILITY_CREATE).object(asset_id);
        if let Some(expires) = expires_at {
            call = call.i64(expires);
        }
        // A non-owner rejection keeps its ledger shape; only
        // capability-authorized calls translate to `Unauthorized`.
        let effects = self
            .ledger
            .submit_call(&call, signer)
            .await
            .map_err(|err| match err.reject_reason() {
                Some(RejectReason::NotFound) => AccessError::NotFound(err.to_string()),
                _ => AccessError::Ledger(err),
            })?;

        let object = effects
            .first_created_of(ObjectKind::Capability)
            .ok_or_else(|| {
                AccessError::InvalidObject("capability effects carried no capability".into())
            })?;
        AccessCapability::from_object(object)
    }

    /// Grant `grantee` an access level on an asset, using a capability the
    /// signer holds.
    ///
    /// Upserts: a first grant creates the record, a re-grant overwrites it.
    /// Granting [`AccessLevel::NONE`] is rejected locally; use
    /// [`AccessControlManager::revoke_access`] to remove access.
    pub async fn grant_access(
        &self,
        signer: &dyn Signer,
        capability_id: ObjectId,
        asset_id: ObjectId,
        grantee: Ed25519PublicKey,
        level: AccessLevel,
    ) -> Result<AccessGrant> {
        if level == AccessLevel::NONE {
            return Err(AccessError::InvalidLevel(level.value()));
        }
        self.check_capability(capability_id, asset_id).await?;

        let call = LedgerCall::new(entry::ACCESS_GRANT)
            .object(capability_id)
            .object(asset_id)
            .public_key(grantee)
            .u8(level.value());
        let effects = self
            .ledger
            .submit_call(&call, signer)
            .await
            .map_err(map_authorization)?;

        let object = effects
            .created_or_mutated_of(ObjectKind::Grant)
            .ok_or_else(|| AccessError::InvalidObject("grant effects carried no grant".into()))?;
        let grant = AccessGrant::from_field(asset_id, object)?;
        tracing::debug!(asset = %asset_id, level = grant.level.value(), "access granted");
        Ok(grant)
    }

    /// Remove `grantee`'s grant on an asset.
    ///
    /// Returns `true` when a grant was removed and `false` when there was
    /// nothing to remove, so calling it twice is harmless. The capability
    /// must cover the asset even when there is nothing to remove. An
    /// ambiguous NotFound rejection is settled by re-reading the grant
    /// field.
    pub async fn revoke_access(
        &self,
        signer: &dyn Signer,
        capability_id: ObjectId,
        asset_id: ObjectId,
        grantee: Ed25519PublicKey,
    ) -> Result<bool> {
        self.check_capability(capability_id, asset_id).await?;
        if self.get_grant(asset_id, &grantee).await?.is_none() {
            return Ok(false);
        }

        let call = LedgerCall::new(entry::ACCESS_REVOKE)
            .object(capability_id)
            .object(asset_id)
            .public_key(grantee);

        match self.ledger.submit_call(&call, signer).await {
            Ok(_) => {
                tracing::debug!(asset = %asset_id, "access revoked");
                Ok(true)
            }
            Err(err) if err.reject_reason() == Some(RejectReason::NotFound) => {
                // Either a concurrent revoker beat us to the grant, or the
                // capability itself is missing. The current grant state
                // tells them apart.
                match self.get_grant(asset_id, &grantee).await? {
                    None => Ok(false),
                    Some(_) => Err(AccessError::NotFound(err.to_string())),
                }
            }
            Err(err) => Err(map_authorization(err)),
        }
    }

    // ───── Reads ─────

    /// Fetch an asset token by id.
    pub async fn get_asset(&self, asset_id: ObjectId) -> Result<Option<AssetToken>> {
        match self.ledger.query_object(asset_id).await? {
            Some(object) => Ok(Some(AssetToken::from_object(&object)?)),
            None => Ok(None),
        }
    }

    /// Read `grantee`'s current grant on an asset, if any.
    ///
    /// This is a single fresh ledger read; there is no caching layer in
    /// front of it.
    pub async fn get_grant(
        &self,
        asset_id: ObjectId,
        grantee: &Ed25519PublicKey,
    ) -> Result<Option<AccessGrant>> {
        let field = self
            .ledger
            .query_dynamic_field(asset_id, grantee.as_bytes())
            .await?;
        match field {
            Some(object) => Ok(Some(AccessGrant::from_field(asset_id, &object)?)),
            None => Ok(None),
        }
    }

    /// Read `grantee`'s effective access level on an asset.
    ///
    /// No grant means [`AccessLevel::NONE`], never an error.
    pub async fn get_access_level(
        &self,
        asset_id: ObjectId,
        grantee: &Ed25519PublicKey,
    ) -> Result<AccessLevel> {
        Ok(self
            .get_grant(asset_id, grantee)
            .await?
            .map(|grant| grant.level)
            .unwrap_or(AccessLevel::NONE))
    }

    /// List all capabilities held by a principal.
    ///
    /// Decoding is strict: a malformed capability object is an error, not
    /// a skipped entry.
    pub async fn list_capabilities(
        &self,
        holder: &Ed25519PublicKey,
    ) -> Result<Vec<AccessCapability>> {
        let objects = self
            .ledger
            .query_owned_objects(holder, ObjectKind::Capability)
            .await?;
        objects
            .iter()
            .map(AccessCapability::from_object)
            .collect()
    }

    /// Find a usable capability the holder has for an asset.
    ///
    /// Returns `None` when the holder has no unexpired capability covering
    /// the asset. Selection is deterministic across calls.
    pub async fn find_capability(
        &self,
        holder: &Ed25519PublicKey,
        asset_id: ObjectId,
    ) -> Result<Option<AccessCapability>> {
        let mut store = CapabilityStore::new();
        for capability in self.list_capabilities(holder).await? {
            store.insert(capability);
        }
        Ok(store.effective_for_asset(&asset_id, now_millis()).cloned())
    }

    /// Find a usable capability for the signer, creating one if none
    /// exists.
    ///
    /// The created capability never expires; pass an explicit expiry
    /// through [`AccessControlManager::create_capability`] if you need one.
    pub async fn find_or_create_capability(
        &self,
        signer: &dyn Signer,
        asset_id: ObjectId,
    ) -> Result<AccessCapability> {
        if let Some(capability) = self.find_capability(&signer.address(), asset_id).await? {
            tracing::debug!(capability = %capability.id, "reusing existing capability");
            return Ok(capability);
        }
        self.create_capability(signer, asset_id, None).await
    }

    // ───── Validation ─────

    /// Check that `capability_id` names an unexpired capability covering
    /// `asset_id`.
    ///
    /// A missing object is [`AccessError::NotFound`]; any other failure is
    /// [`AccessError::Unauthorized`]. The ledger re-checks the same rules
    /// at execution, so passing here is necessary, not sufficient.
    async fn check_capability(&self, capability_id: ObjectId, asset_id: ObjectId) -> Result<()> {
        let object = self
            .ledger
            .query_object(capability_id)
            .await?
            .ok_or_else(|| AccessError::NotFound(format!("no capability {}", capability_id)))?;
        let capability = AccessCapability::from_object(&object).map_err(|_| {
            AccessError::Unauthorized(format!("object {} is not a capability", capability_id))
        })?;
        if capability.asset_id != asset_id {
            return Err(AccessError::Unauthorized(format!(
                "capability {} does not cover asset {}",
                capability_id, asset_id
            )));
        }
        if capability.is_expired(now_millis()) {
            return Err(AccessError::Unauthorized(format!(
                "capability {} has expired",
                capability_id
            )));
        }
        Ok(())
    }
}
