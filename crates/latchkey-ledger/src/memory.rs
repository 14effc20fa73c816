//! In-memory implementation of the ledger.
//!
//! Executes the access-control program's entry points in-process with the
//! same observable semantics as the real ledger: owner checks, typed
//! rejections, and normalized effects. Primarily for tests and local
//! development.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use latchkey_core::{now_millis, Ed25519PublicKey, ObjectId, ObjectKind, TxDigest};

use crate::call::{entry, CallArg, LedgerCall};
use crate::effects::{LedgerEffects, LedgerEvent, LedgerObject, Owner};
use crate::error::{LedgerError, RejectReason, Result};
use crate::objects::{AssetRecord, CapabilityRecord, GrantRecord, MAX_ACCESS_LEVEL};
use crate::traits::{LedgerClient, Signer};

/// In-memory ledger implementation.
///
/// All state is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
}

struct MemoryLedgerInner {
    /// All live objects by address.
    objects: HashMap<ObjectId, LedgerObject>,

    /// Owner index: address -> object ids.
    owned: HashMap<Ed25519PublicKey, BTreeSet<ObjectId>>,

    /// Dynamic fields: (parent, key bytes) -> field object id.
    fields: HashMap<(ObjectId, Vec<u8>), ObjectId>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                objects: HashMap::new(),
                owned: HashMap::new(),
                fields: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn submit_call(&self, call: &LedgerCall, signer: &dyn Signer) -> Result<LedgerEffects> {
        // Sign and verify before taking the lock.
        let signing = call.signing_bytes()?;
        let signature = signer.sign_message(&signing).await?;
        let sender = signer.address();
        sender.verify(&signing, &signature).map_err(|_| {
            LedgerError::rejected(RejectReason::Other, "transaction signature invalid")
        })?;

        let mut inner = self.inner.write().unwrap();
        match call.entry_point.as_str() {
            entry::ASSET_MINT => inner.mint_asset(&sender, call),
            entry::CAPABILITY_CREATE => inner.create_capability(&sender, call),
            entry::ACCESS_GRANT => inner.grant(&sender, call),
            entry::ACCESS_REVOKE => inner.revoke(&sender, call),
            other => Err(LedgerError::rejected(
                RejectReason::InvalidArgument,
                format!("unknown entry point: {}", other),
            )),
        }
    }

    async fn query_object(&self, id: ObjectId) -> Result<Option<LedgerObject>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.objects.get(&id).cloned())
    }

    async fn query_owned_objects(
        &self,
        owner: &Ed25519PublicKey,
        kind: ObjectKind,
    ) -> Result<Vec<LedgerObject>> {
        let inner = self.inner.read().unwrap();

        let objects = inner
            .owned
            .get(owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.objects.get(id))
                    .filter(|o| o.kind == kind)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(objects)
    }

    async fn query_dynamic_field(
        &self,
        parent: ObjectId,
        key: &[u8],
    ) -> Result<Option<LedgerObject>> {
        let inner = self.inner.read().unwrap();

        let object = inner
            .fields
            .get(&(parent, key.to_vec()))
            .and_then(|id| inner.objects.get(id))
            .cloned();

        Ok(object)
    }
}

impl MemoryLedgerInner {
    fn insert_object(&mut self, object: LedgerObject) {
        if let Owner::Address(owner) = object.owner {
            self.owned.entry(owner).or_default().insert(object.id);
        }
        self.objects.insert(object.id, object);
    }

    /// `asset::mint(title)` - mint an ownership token for the sender.
    fn mint_asset(&mut self, sender: &Ed25519PublicKey, call: &LedgerCall) -> Result<LedgerEffects> {
        let title = match call.arg(0) {
            Some(CallArg::Text(title)) => title.clone(),
            _ => {
                return Err(LedgerError::rejected(
                    RejectReason::InvalidArgument,
                    "asset::mint expects a title",
                ))
            }
        };

        let digest = TxDigest::random();
        let record = AssetRecord {
            title,
            creator: *sender,
            created_at: now_millis(),
        };
        let object = LedgerObject {
            id: ObjectId::derive(&digest, 0),
            kind: ObjectKind::Asset,
            version: 1,
            owner: Owner::Address(*sender),
            contents: record.to_bytes().into(),
        };
        self.insert_object(object.clone());

        Ok(LedgerEffects {
            digest,
            created: vec![object],
            mutated: vec![],
            deleted: vec![],
            events: vec![],
        })
    }

    /// `access::create_capability(asset [, expires_at])` - delegate admin
    /// rights over an owned asset.
    fn create_capability(
        &mut self,
        sender: &Ed25519PublicKey,
        call: &LedgerCall,
    ) -> Result<LedgerEffects> {
        let asset_id = match call.arg(0) {
            Some(CallArg::Object(id)) => *id,
            _ => {
                return Err(LedgerError::rejected(
                    RejectReason::InvalidArgument,
                    "access::create_capability expects an asset",
                ))
            }
        };
        let expires_at = match call.arg(1) {
            Some(CallArg::I64(ms)) => Some(*ms),
            None => None,
            _ => {
                return Err(LedgerError::rejected(
                    RejectReason::InvalidArgument,
                    "expiry must be a millisecond timestamp",
                ))
            }
        };

        let asset = self.objects.get(&asset_id).ok_or_else(|| {
            LedgerError::rejected(RejectReason::NotFound, format!("no object {}", asset_id))
        })?;
        if asset.kind != ObjectKind::Asset {
            return Err(LedgerError::rejected(
                RejectReason::InvalidArgument,
                format!("object {} is not an asset", asset_id),
            ));
        }
        if !asset.is_owned_by(sender) {
            return Err(LedgerError::rejected(
                RejectReason::NotOwner,
                format!("sender does not own asset {}", asset_id),
            ));
        }

        let digest = TxDigest::random();
        let record = CapabilityRecord {
            asset_id,
            expires_at,
        };
        let object = LedgerObject {
            id: ObjectId::derive(&digest, 0),
            kind: ObjectKind::Capability,
            version: 1,
            owner: Owner::Address(*sender),
            contents: record.to_bytes().into(),
        };
        self.insert_object(object.clone());

        Ok(LedgerEffects {
            digest,
            created: vec![object],
            mutated: vec![],
            deleted: vec![],
            events: vec![],
        })
    }

    /// Validate the capability presented for a grant or revoke.
    ///
    /// The capability must exist, be held by the sender, match the asset,
    /// and be unexpired.
    fn check_capability(
        &self,
        sender: &Ed25519PublicKey,
        capability_id: ObjectId,
        asset_id: ObjectId,
    ) -> Result<()> {
        let capability = self.objects.get(&capability_id).ok_or_else(|| {
            LedgerError::rejected(
                RejectReason::NotFound,
                format!("no capability {}", capability_id),
            )
        })?;
        if capability.kind != ObjectKind::Capability {
            return Err(LedgerError::rejected(
                RejectReason::InvalidArgument,
                format!("object {} is not a capability", capability_id),
            ));
        }
        if !capability.is_owned_by(sender) {
            return Err(LedgerError::rejected(
                RejectReason::NotOwner,
                format!("sender does not hold capability {}", capability_id),
            ));
        }

        let record = CapabilityRecord::from_bytes(&capability.contents)?;
        if record.asset_id != asset_id {
            return Err(LedgerError::rejected(
                RejectReason::InvalidArgument,
                format!(
                    "capability {} does not cover asset {}",
                    capability_id, asset_id
                ),
            ));
        }
        if record.is_expired(now_millis()) {
            return Err(LedgerError::rejected(
                RejectReason::Expired,
                format!("capability {} has expired", capability_id),
            ));
        }
        Ok(())
    }

    /// `access::grant(capability, asset, grantee, level)` - upsert a grant
    /// field on the asset.
    fn grant(&mut self, sender: &Ed25519PublicKey, call: &LedgerCall) -> Result<LedgerEffects> {
        let (capability_id, asset_id, grantee, level) =
            match (call.arg(0), call.arg(1), call.arg(2), call.arg(3)) {
                (
                    Some(CallArg::Object(capability)),
                    Some(CallArg::Object(asset)),
                    Some(CallArg::PublicKey(grantee)),
                    Some(CallArg::U8(level)),
                ) => (*capability, *asset, *grantee, *level),
                _ => {
                    return Err(LedgerError::rejected(
                        RejectReason::InvalidArgument,
                        "access::grant expects (capability, asset, grantee, level)",
                    ))
                }
            };

        self.check_capability(sender, capability_id, asset_id)?;
        if level == 0 || level > MAX_ACCESS_LEVEL {
            return Err(LedgerError::rejected(
                RejectReason::InvalidArgument,
                format!("level {} outside 1..={}", level, MAX_ACCESS_LEVEL),
            ));
        }

        let digest = TxDigest::random();
        let record = GrantRecord {
            grantee,
            level,
            granted_at: now_millis(),
        };
        let field_key = (asset_id, grantee.as_bytes().to_vec());
        let event = LedgerEvent {
            label: "access::granted".to_string(),
            asset_id,
            data: record.to_bytes(),
        };

        let (created, mutated) = match self.fields.get(&field_key).copied() {
            // Re-grant: replace the record in place, bump the version.
            Some(existing_id) => {
                let existing = self
                    .objects
                    .get_mut(&existing_id)
                    .ok_or_else(|| LedgerError::rejected(RejectReason::Other, "dangling field"))?;
                existing.version += 1;
                existing.contents = record.to_bytes().into();
                (vec![], vec![existing.clone()])
            }
            None => {
                let object = LedgerObject {
                    id: ObjectId::derive(&digest, 0),
                    kind: ObjectKind::Grant,
                    version: 1,
                    owner: Owner::Object(asset_id),
                    contents: record.to_bytes().into(),
                };
                self.fields.insert(field_key, object.id);
                self.insert_object(object.clone());
                (vec![object], vec![])
            }
        };

        Ok(LedgerEffects {
            digest,
            created,
            mutated,
            deleted: vec![],
            events: vec![event],
        })
    }

    /// `access::revoke(capability, asset, grantee)` - delete the grant
    /// field. Rejects with NotFound when no grant exists.
    fn revoke(&mut self, sender: &Ed25519PublicKey, call: &LedgerCall) -> Result<LedgerEffects> {
        let (capability_id, asset_id, grantee) = match (call.arg(0), call.arg(1), call.arg(2)) {
            (
                Some(CallArg::Object(capability)),
                Some(CallArg::Object(asset)),
                Some(CallArg::PublicKey(grantee)),
            ) => (*capability, *asset, *grantee),
            _ => {
                return Err(LedgerError::rejected(
                    RejectReason::InvalidArgument,
                    "access::revoke expects (capability, asset, grantee)",
                ))
            }
        };

        self.check_capability(sender, capability_id, asset_id)?;

        let field_key = (asset_id, grantee.as_bytes().to_vec());
        let field_id = self.fields.remove(&field_key).ok_or_else(|| {
            LedgerError::rejected(
                RejectReason::NotFound,
                format!("no grant on {} for principal", asset_id),
            )
        })?;
        let removed = self
            .objects
            .remove(&field_id)
            .ok_or_else(|| LedgerError::rejected(RejectReason::Other, "dangling field"))?;

        Ok(LedgerEffects {
            digest: TxDigest::random(),
            created: vec![],
            mutated: vec![],
            deleted: vec![field_id],
            events: vec![LedgerEvent {
                label: "access::revoked".to_string(),
                asset_id,
                data: removed.contents.to_vec(),
            }],
        })
    }
}
