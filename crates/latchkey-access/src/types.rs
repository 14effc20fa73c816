//! Domain views of on-ledger access-control objects.
//!
//! The ledger hands back generic [`LedgerObject`]s; these types decode
//! them into the shapes the rest of the pipeline works with. Decoding
//! always checks the object kind first, so a capability can never be
//! mistaken for an asset.

use serde::{Deserialize, Serialize};

use latchkey_core::{Ed25519PublicKey, ObjectId, ObjectKind};
use latchkey_ledger::{AssetRecord, CapabilityRecord, GrantRecord, LedgerObject, Owner};

use crate::error::{AccessError, Result};
use crate::level::AccessLevel;

/// An ownership token for a published asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetToken {
    /// Ledger address of the token.
    pub id: ObjectId,

    /// Current owner.
    pub owner: Ed25519PublicKey,

    /// Title given at mint time.
    pub title: String,

    /// The principal that minted the asset.
    pub creator: Ed25519PublicKey,

    /// Mint time (Unix milliseconds).
    pub created_at: i64,
}

impl AssetToken {
    /// Decode an asset token from a ledger object.
    pub fn from_object(object: &LedgerObject) -> Result<Self> {
        if object.kind != ObjectKind::Asset {
            return Err(AccessError::InvalidObject(format!(
                "expected asset, got {:?}",
                object.kind
            )));
        }
        let owner = match object.owner {
            Owner::Address(key) => key,
            _ => {
                return Err(AccessError::InvalidObject(
                    "asset token must be address-owned".into(),
                ))
            }
        };
        let record = AssetRecord::from_bytes(&object.contents)?;
        Ok(Self {
            id: object.id,
            owner,
            title: record.title,
            creator: record.creator,
            created_at: record.created_at,
        })
    }
}

/// A delegatable capability to administer grants on one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCapability {
    /// Ledger address of the capability.
    pub id: ObjectId,

    /// The principal holding the capability.
    pub holder: Ed25519PublicKey,

    /// The asset this capability administers.
    pub asset_id: ObjectId,

    /// Optional expiry (Unix milliseconds).
    pub expires_at: Option<i64>,
}

impl AccessCapability {
    /// Decode a capability from a ledger object.
    pub fn from_object(object: &LedgerObject) -> Result<Self> {
        if object.kind != ObjectKind::Capability {
            return Err(AccessError::InvalidObject(format!(
                "expected capability, got {:?}",
                object.kind
            )));
        }
        let holder = match object.owner {
            Owner::Address(key) => key,
            _ => {
                return Err(AccessError::InvalidObject(
                    "capability must be address-owned".into(),
                ))
            }
        };
        let record = CapabilityRecord::from_bytes(&object.contents)?;
        Ok(Self {
            id: object.id,
            holder,
            asset_id: record.asset_id,
            expires_at: record.expires_at,
        })
    }

    /// Check whether the capability has expired at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }
}

/// A principal's current grant on an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// The asset the grant applies to.
    pub asset_id: ObjectId,

    /// The principal holding the grant.
    pub grantee: Ed25519PublicKey,

    /// Ordered access level.
    pub level: AccessLevel,

    /// When the grant was written (Unix milliseconds).
    pub granted_at: i64,
}

impl AccessGrant {
    /// Decode a grant from the dynamic field attached to `asset_id`.
    pub fn from_field(asset_id: ObjectId, object: &LedgerObject) -> Result<Self> {
        if object.kind != ObjectKind::Grant {
            return Err(AccessError::InvalidObject(format!(
                "expected grant, got {:?}",
                object.kind
            )));
        }
        let record = GrantRecord::from_bytes(&object.contents)?;
        Ok(Self {
            asset_id,
            grantee: record.grantee,
            level: AccessLevel::new(record.level)?,
            granted_at: record.granted_at,
        })
    }
}
