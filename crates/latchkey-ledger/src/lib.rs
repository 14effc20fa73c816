//! # Latchkey Ledger
//!
//! The ledger boundary: typed calls, normalized effects, and the signer
//! abstraction.
//!
//! ## Overview
//!
//! Assets, capabilities, and grants live on a ledger running the published
//! access-control program. This crate defines:
//!
//! - [`LedgerClient`] - submit transactions and read objects
//! - [`Signer`] - an opaque signing capability for one principal
//! - [`LedgerCall`] - a typed call against a published entry point
//! - [`LedgerEffects`] - the single normalized shape of transaction results
//! - [`MemoryLedger`] - an in-process implementation with real semantics
//!
//! ## Failure Model
//!
//! Submissions are at-least-once; sequencing is exactly-once. A
//! [`LedgerError::Transient`] leaves the outcome unknown, so callers must
//! reconcile by reading current state before retrying. A
//! [`LedgerError::Rejected`] is definitive and carries a typed
//! [`RejectReason`].

pub mod call;
pub mod effects;
pub mod error;
pub mod memory;
pub mod objects;
pub mod traits;

pub use call::{entry, CallArg, LedgerCall};
pub use effects::{LedgerEffects, LedgerEvent, LedgerObject, Owner};
pub use error::{LedgerError, RejectReason, Result};
pub use memory::MemoryLedger;
pub use objects::{AssetRecord, CapabilityRecord, GrantRecord, MAX_ACCESS_LEVEL};
pub use traits::{LedgerClient, LocalSigner, Signer};
