//! Proptest generators for property-based testing.

use proptest::prelude::*;

use latchkey_access::AccessLevel;
use latchkey_core::{Blake3Hash, BlobId, Ed25519PublicKey, JourneyId, Keypair, ObjectId, TxDigest};
use latchkey_ledger::MAX_ACCESS_LEVEL;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a random ObjectId.
pub fn object_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 32]>().prop_map(ObjectId::from_bytes)
}

/// Generate a random JourneyId.
pub fn journey_id() -> impl Strategy<Value = JourneyId> {
    any::<[u8; 32]>().prop_map(JourneyId::from_bytes)
}

/// Generate a random BlobId.
pub fn blob_id() -> impl Strategy<Value = BlobId> {
    any::<[u8; 32]>().prop_map(BlobId::from_bytes)
}

/// Generate a random transaction digest.
pub fn tx_digest() -> impl Strategy<Value = TxDigest> {
    any::<[u8; 32]>().prop_map(TxDigest::from_bytes)
}

/// Generate a random Blake3Hash.
pub fn blake3_hash() -> impl Strategy<Value = Blake3Hash> {
    any::<[u8; 32]>().prop_map(Blake3Hash)
}

/// Generate any valid access level, including none.
pub fn access_level() -> impl Strategy<Value = AccessLevel> {
    (0..=MAX_ACCESS_LEVEL).prop_filter_map("valid level", |v| AccessLevel::new(v).ok())
}

/// Generate a grantable access level (at least 1).
pub fn grant_level() -> impl Strategy<Value = AccessLevel> {
    (1..=MAX_ACCESS_LEVEL).prop_filter_map("valid level", |v| AccessLevel::new(v).ok())
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate an asset title.
pub fn title() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_access::AssetToken;
    use latchkey_core::{from_cbor_bytes, to_canonical_bytes};

    proptest! {
        #[test]
        fn test_object_id_derivation_deterministic(digest in tx_digest(), index in any::<u16>()) {
            let a = ObjectId::derive(&digest, index);
            let b = ObjectId::derive(&digest, index);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn test_object_id_distinct_per_index(digest in tx_digest(), index in 0u16..u16::MAX) {
            let a = ObjectId::derive(&digest, index);
            let b = ObjectId::derive(&digest, index + 1);
            prop_assert_ne!(a, b);
        }

        #[test]
        fn test_blob_id_is_content_addressed(p1 in payload(256), p2 in payload(256)) {
            prop_assert_eq!(BlobId::derive(&p1), BlobId::derive(&p1));
            prop_assume!(p1 != p2);
            prop_assert_ne!(BlobId::derive(&p1), BlobId::derive(&p2));
        }

        #[test]
        fn test_access_level_allows_matches_ordering(a in access_level(), b in access_level()) {
            prop_assert_eq!(a.allows(b), a.value() >= b.value());
        }

        #[test]
        fn test_asset_token_cbor_roundtrip(
            id in object_id(),
            owner in public_key(),
            name in title(),
            created_at in 0i64..=i64::MAX / 2,
        ) {
            let token = AssetToken {
                id,
                owner,
                title: name,
                creator: owner,
                created_at,
            };
            let bytes = to_canonical_bytes(&token).unwrap();
            let decoded: AssetToken = from_cbor_bytes(&bytes).unwrap();
            prop_assert_eq!(decoded, token);
        }
    }
}
