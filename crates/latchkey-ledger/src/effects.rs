//! Normalized transaction effects.
//!
//! Different ledger backends report results in different shapes; every
//! client implementation converts its native response into
//! [`LedgerEffects`] at the boundary so the rest of the system sees one
//! typed view.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use latchkey_core::{Ed25519PublicKey, ObjectId, ObjectKind, TxDigest};

/// Who controls a ledger object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Owned by a principal's address.
    Address(Ed25519PublicKey),

    /// Attached to a parent object (dynamic fields).
    Object(ObjectId),

    /// Shared, no single controller.
    Shared,
}

/// A ledger object as returned by queries and effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerObject {
    /// The object's address.
    pub id: ObjectId,

    /// Discriminant for decoding `contents`.
    pub kind: ObjectKind,

    /// Version, bumped on every mutation.
    pub version: u64,

    /// Current controller.
    pub owner: Owner,

    /// CBOR-encoded record, see [`crate::objects`].
    pub contents: Bytes,
}

impl LedgerObject {
    /// Check whether the object is address-owned by the given principal.
    pub fn is_owned_by(&self, key: &Ed25519PublicKey) -> bool {
        matches!(self.owner, Owner::Address(owner) if owner == *key)
    }
}

/// An event emitted by an entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Event label, e.g. `access::granted`.
    pub label: String,

    /// The asset the event concerns.
    pub asset_id: ObjectId,

    /// CBOR-encoded event payload.
    pub data: Vec<u8>,
}

/// The effects of one sequenced transaction.
///
/// A digest exists only for transactions that reached consensus; a
/// submission that failed transiently has no effects at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEffects {
    /// Digest assigned at consensus.
    pub digest: TxDigest,

    /// Objects created by the transaction.
    pub created: Vec<LedgerObject>,

    /// Objects mutated by the transaction.
    pub mutated: Vec<LedgerObject>,

    /// Objects deleted by the transaction.
    pub deleted: Vec<ObjectId>,

    /// Events emitted during execution.
    pub events: Vec<LedgerEvent>,
}

impl LedgerEffects {
    /// First created object of the given kind, if any.
    pub fn first_created_of(&self, kind: ObjectKind) -> Option<&LedgerObject> {
        self.created.iter().find(|o| o.kind == kind)
    }

    /// First object of the given kind, looking at created then mutated.
    ///
    /// Upserting entry points (re-granting an existing grant) report the
    /// object as mutated rather than created; callers that only need the
    /// resulting object use this.
    pub fn created_or_mutated_of(&self, kind: ObjectKind) -> Option<&LedgerObject> {
        self.first_created_of(kind)
            .or_else(|| self.mutated.iter().find(|o| o.kind == kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(kind: ObjectKind, byte: u8) -> LedgerObject {
        LedgerObject {
            id: ObjectId::from_bytes([byte; 32]),
            kind,
            version: 1,
            owner: Owner::Shared,
            contents: Bytes::new(),
        }
    }

    #[test]
    fn test_first_created_of_filters_kind() {
        let effects = LedgerEffects {
            digest: TxDigest::from_bytes([0; 32]),
            created: vec![object(ObjectKind::Asset, 1), object(ObjectKind::Capability, 2)],
            mutated: vec![],
            deleted: vec![],
            events: vec![],
        };

        let found = effects.first_created_of(ObjectKind::Capability).unwrap();
        assert_eq!(found.id, ObjectId::from_bytes([2; 32]));
        assert!(effects.first_created_of(ObjectKind::Grant).is_none());
    }

    #[test]
    fn test_created_or_mutated_falls_back() {
        let effects = LedgerEffects {
            digest: TxDigest::from_bytes([0; 32]),
            created: vec![],
            mutated: vec![object(ObjectKind::Grant, 3)],
            deleted: vec![],
            events: vec![],
        };

        let found = effects.created_or_mutated_of(ObjectKind::Grant).unwrap();
        assert_eq!(found.version, 1);
    }

    #[test]
    fn test_is_owned_by() {
        let key = Ed25519PublicKey::from_bytes([5; 32]);
        let other = Ed25519PublicKey::from_bytes([6; 32]);
        let obj = LedgerObject {
            id: ObjectId::from_bytes([1; 32]),
            kind: ObjectKind::Asset,
            version: 1,
            owner: Owner::Address(key),
            contents: Bytes::new(),
        };

        assert!(obj.is_owned_by(&key));
        assert!(!obj.is_owned_by(&other));
    }
}
