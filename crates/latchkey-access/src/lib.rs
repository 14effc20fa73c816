//! # Latchkey Access
//!
//! Capability-based access control over ledger-held ownership tokens.
//!
//! ## Overview
//!
//! Access to an asset is governed by three on-ledger objects:
//!
//! - **AssetToken**: the ownership token minted for a published asset
//! - **AccessCapability**: a delegatable right to administer grants,
//!   held by the asset owner (or whoever they hand it to)
//! - **AccessGrant**: a per-principal record attached to the asset,
//!   carrying an ordered access level
//!
//! The ledger is the single source of truth: authorization checks are
//! fresh reads of the grant record, so a revoke takes effect the moment
//! it lands. There is no grant cache to invalidate.
//!
//! ## Access Levels
//!
//! Levels are ordered small integers. A grant at level `n` satisfies any
//! check at level `m <= n`; [`AccessLevel::DECRYPT`] is the threshold the
//! key servers enforce before releasing key shares.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use latchkey_access::{AccessControlManager, AccessLevel};
//! use latchkey_ledger::{LocalSigner, MemoryLedger, Signer};
//!
//! # async fn demo() -> latchkey_access::Result<()> {
//! let manager = AccessControlManager::new(Arc::new(MemoryLedger::new()));
//! let owner = LocalSigner::random();
//! let reader = LocalSigner::random();
//!
//! let asset = manager.mint_asset(&owner, "quarterly report").await?;
//! let capability = manager.find_or_create_capability(&owner, asset.id).await?;
//! manager
//!     .grant_access(&owner, capability.id, asset.id, reader.address(), AccessLevel::DECRYPT)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod level;
pub mod manager;
pub mod store;
pub mod types;

pub use error::{AccessError, Result};
pub use level::AccessLevel;
pub use manager::AccessControlManager;
pub use store::CapabilityStore;
pub use types::{AccessCapability, AccessGrant, AssetToken};
