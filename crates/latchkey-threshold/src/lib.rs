//! # Latchkey Threshold
//!
//! Quorum-gated encryption for published payloads.
//!
//! ## Overview
//!
//! A payload is encrypted once, under a key derived from a secret that
//! is Shamir-split across N independent key servers. Decrypting needs
//! any `threshold` of them to release their shares, and each server
//! releases only after verifying, on its own:
//!
//! 1. the caller's [`SessionToken`](latchkey_session::SessionToken) is
//!    signed and unexpired, and
//! 2. the caller's *current* grant on the policy's asset clears the
//!    decrypt level — read fresh from the ledger on every request.
//!
//! Revoking a grant therefore locks a principal out of every future
//! decrypt immediately, even though the stored ciphertext never
//! changes. No single server (below the threshold) can reconstruct the
//! key, and the engine holds no key material between calls.
//!
//! ## Layout
//!
//! - [`shamir`]: secret splitting and Lagrange reconstruction
//! - [`cipher`]: ChaCha20-Poly1305 payload encryption and key derivation
//! - [`policy`]: policy identifiers and the [`EncryptedPayload`] envelope
//! - [`server`]: the [`KeyServer`] trait and its in-memory implementation
//! - [`engine`]: the quorum coordinator

pub mod cipher;
pub mod engine;
pub mod error;
pub mod policy;
pub mod server;
pub mod shamir;

pub use cipher::{derive_content_key, EncryptionKey, EncryptionNonce};
pub use engine::ThresholdEncryptionEngine;
pub use error::{Result, ThresholdError};
pub use policy::{EncryptedPayload, EncryptionFormat, PolicyId};
pub use server::{KeyServer, KeyShare, MemoryKeyServer, ServerStatus};
pub use shamir::{interpolate_at_zero, SecretPolynomial, SharePoint};
