//! # Latchkey Core
//!
//! Pure primitives shared by every latchkey crate: identifiers, signing
//! keys, timestamps, and deterministic CBOR encoding.
//!
//! This crate contains no I/O, no ledger access, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`ObjectId`] - Address of an object on the ledger (assets, capabilities)
//! - [`TxDigest`] - Digest assigned to a transaction at consensus
//! - [`BlobId`] - Content-derived address of a stored blob
//! - [`JourneyId`] - Identifier of a publishing journey
//! - [`Keypair`] - Ed25519 signing identity of a principal
//!
//! ## Canonicalization
//!
//! Anything that gets signed (session challenges) or exported (session
//! tokens) is encoded with deterministic CBOR. See the [`canonical`]
//! module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod time;
pub mod types;

pub use canonical::{from_cbor_bytes, to_canonical_bytes};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, Result};
pub use time::{minutes_to_millis, now_millis};
pub use types::{BlobId, JourneyId, ObjectId, ObjectKind, TxDigest};
