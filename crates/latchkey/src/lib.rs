//! # Latchkey
//!
//! The unified API for the latchkey pipeline - capability-gated
//! publishing of threshold-encrypted payloads.
//!
//! ## Overview
//!
//! Latchkey publishes a payload so that only principals the owner has
//! granted access to can ever decrypt it:
//!
//! - **Assets**: On-ledger ownership tokens; access is granted per asset
//! - **Grants**: Ordered access levels written to the ledger, readable by anyone
//! - **Sessions**: Short-lived signed keys that stand in for the owner's wallet
//! - **Threshold encryption**: Content keys split across N key servers, any T reconstruct
//! - **Blob storage**: Content-addressed ciphertext with verifiable ids
//!
//! ## The journey
//!
//! Publishing runs as a nine-step journey: mint-asset,
//! create-capability, grant-access, verify-access, init-encryption,
//! sign-session, select-payload, encrypt, store. Each step's artifact
//! is persisted as it lands, and progress is derived from the artifacts
//! alone, so a journey interrupted anywhere resumes at the first step
//! whose artifact is missing.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use latchkey::access::{AccessControlManager, AccessLevel};
//! use latchkey::blob::MemoryBlobStore;
//! use latchkey::ledger::{LedgerClient, LocalSigner, MemoryLedger, Signer};
//! use latchkey::session::SessionKeyManager;
//! use latchkey::threshold::{KeyServer, MemoryKeyServer, ThresholdEncryptionEngine};
//! use latchkey::{
//!     MemoryJourneyStore, OrchestratorConfig, PublishRequest, PublishingOrchestrator,
//! };
//!
//! async fn example() {
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let servers: Vec<Arc<dyn KeyServer>> = (1..=3u8)
//!         .map(|id| {
//!             Arc::new(MemoryKeyServer::new(id, ledger.clone() as Arc<dyn LedgerClient>))
//!                 as Arc<dyn KeyServer>
//!         })
//!         .collect();
//!
//!     let orchestrator = PublishingOrchestrator::new(
//!         Arc::new(LocalSigner::random()),
//!         AccessControlManager::new(ledger.clone() as Arc<dyn LedgerClient>),
//!         SessionKeyManager::new(10),
//!         ThresholdEncryptionEngine::new(servers),
//!         Arc::new(MemoryBlobStore::new()),
//!         Arc::new(MemoryJourneyStore::new()),
//!         OrchestratorConfig::default(),
//!     );
//!
//!     let reader = LocalSigner::random();
//!     let journey = orchestrator
//!         .start(PublishRequest {
//!             title: "field notes".to_string(),
//!             grantee: reader.address(),
//!             level: AccessLevel::DECRYPT,
//!             payload: b"the notes themselves".to_vec(),
//!         })
//!         .await
//!         .unwrap();
//!
//!     // Run the journey to completion.
//!     while !orchestrator.get_state(journey.id()).await.unwrap().is_complete() {
//!         orchestrator.advance(journey.id()).await.unwrap();
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `latchkey::core` - Shared primitives (ids, keys, canonical CBOR)
//! - `latchkey::ledger` - Ledger and signer abstractions
//! - `latchkey::access` - Assets, capabilities, grants
//! - `latchkey::session` - Session keys
//! - `latchkey::threshold` - Threshold encryption engine and key servers
//! - `latchkey::blob` - Content-addressed blob storage

pub mod config;
pub mod error;
pub mod journey;
pub mod orchestrator;
pub mod store;

// Re-export component crates
pub use latchkey_access as access;
pub use latchkey_blob as blob;
pub use latchkey_core as core;
pub use latchkey_ledger as ledger;
pub use latchkey_session as session;
pub use latchkey_threshold as threshold;

// Re-export main types for convenience
pub use config::{BlobConfig, OrchestratorConfig, QuorumConfig};
pub use error::{PublishError, Result};
pub use journey::{
    JourneyData, PayloadSelection, PublishJourney, PublishRequest, PublishedBlob, StepId,
};
pub use orchestrator::PublishingOrchestrator;
pub use store::{JourneyStore, MemoryJourneyStore, SqliteJourneyStore, StoreError};

// Re-export commonly used component types
pub use latchkey_access::{AccessCapability, AccessGrant, AccessLevel, AssetToken};
pub use latchkey_blob::{BlobStore, StoredBlob};
pub use latchkey_core::{
    Blake3Hash, BlobId, Ed25519PublicKey, Ed25519Signature, JourneyId, Keypair, ObjectId,
};
pub use latchkey_ledger::{LedgerClient, LocalSigner, Signer};
pub use latchkey_session::{SessionKey, SessionKeyManager};
pub use latchkey_threshold::{EncryptedPayload, PolicyId, ThresholdEncryptionEngine};
