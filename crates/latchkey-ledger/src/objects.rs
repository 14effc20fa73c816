//! On-ledger record layouts of the access-control program.
//!
//! These are the published contents of the objects the program creates:
//! asset tokens, capabilities, and grant fields. Clients decode
//! [`crate::LedgerObject::contents`] into these records; the in-memory
//! ledger encodes them when executing entry points.

use serde::{Deserialize, Serialize};

use latchkey_core::{CoreError, Ed25519PublicKey, ObjectId};

/// Highest access level the program accepts.
///
/// Levels are ordered: holding level k implies every permission of lower
/// levels. Level 0 means no access and is never stored as a grant.
pub const MAX_ACCESS_LEVEL: u8 = 10;

/// Contents of an asset ownership token.
///
/// Immutable once minted; ownership changes hands via ledger transfer,
/// the record itself is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Human-readable title of the published asset.
    pub title: String,

    /// The principal that minted the asset.
    pub creator: Ed25519PublicKey,

    /// Mint time (Unix milliseconds).
    pub created_at: i64,
}

impl AssetRecord {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// Contents of a capability object.
///
/// A capability authorizes its holder to administer grants on one asset.
/// The ledger does not enforce uniqueness per (asset, holder); callers
/// search before creating to avoid duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    /// The asset this capability administers.
    pub asset_id: ObjectId,

    /// Optional expiry (Unix milliseconds). `None` means never.
    pub expires_at: Option<i64>,
}

impl CapabilityRecord {
    /// Check whether the capability has expired at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// Contents of a grant field attached to an asset.
///
/// Stored as a dynamic field of the asset object, keyed by the grantee's
/// public key bytes. Re-granting replaces the record; revoking deletes
/// the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// The principal holding the grant.
    pub grantee: Ed25519PublicKey,

    /// Ordered access level, 1..=[`MAX_ACCESS_LEVEL`].
    pub level: u8,

    /// When the grant was written (Unix milliseconds).
    pub granted_at: i64,
}

impl GrantRecord {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_record_roundtrip() {
        let record = AssetRecord {
            title: "pricing workflow".to_string(),
            creator: Ed25519PublicKey::from_bytes([7; 32]),
            created_at: 1736870400000,
        };
        let bytes = record.to_bytes();
        let recovered = AssetRecord::from_bytes(&bytes).unwrap();
        assert_eq!(record, recovered);
    }

    #[test]
    fn test_capability_expiry() {
        let open = CapabilityRecord {
            asset_id: ObjectId::from_bytes([1; 32]),
            expires_at: None,
        };
        assert!(!open.is_expired(i64::MAX));

        let bounded = CapabilityRecord {
            asset_id: ObjectId::from_bytes([1; 32]),
            expires_at: Some(1000),
        };
        assert!(!bounded.is_expired(1000));
        assert!(bounded.is_expired(1001));
    }

    #[test]
    fn test_grant_record_roundtrip() {
        let record = GrantRecord {
            grantee: Ed25519PublicKey::from_bytes([9; 32]),
            level: 6,
            granted_at: 42,
        };
        let recovered = GrantRecord::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(record, recovered);
    }

    #[test]
    fn test_grant_record_rejects_garbage() {
        assert!(GrantRecord::from_bytes(&[0xff, 0x00, 0x01]).is_err());
    }
}
