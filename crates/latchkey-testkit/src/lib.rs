//! # Latchkey Testkit
//!
//! Testing utilities for the latchkey pipeline.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A ready-made ledger, access manager, and encryption
//!   quorum sharing one in-memory ledger
//! - **Faults**: Ledger wrappers that fail in the precise ways the
//!   pipeline must tolerate
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Quickly set up a working pipeline:
//!
//! ```rust
//! use latchkey_testkit::fixtures::TestFixture;
//! use latchkey_testkit::AccessLevel;
//!
//! # async fn demo() {
//! let fixture = TestFixture::new(3);
//! let asset = fixture.mint("my-asset").await.unwrap();
//! fixture
//!     .grant(asset.id, fixture.public_key(), AccessLevel::DECRYPT)
//!     .await
//!     .unwrap();
//! # }
//! ```
//!
//! ## Fault Injection
//!
//! [`AckDropLedger`] commits submissions but reports them as transient
//! failures, the ambiguous outcome retry logic has to reconcile:
//!
//! ```rust,ignore
//! let faulty = AckDropLedger::new(ledger);
//! faulty.drop_next_acks(1);
//! // next write lands on the ledger yet returns LedgerError::Transient
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use latchkey_testkit::generators;
//!
//! proptest! {
//!     #[test]
//!     fn level_ordering(a in generators::access_level(), b in generators::access_level()) {
//!         prop_assert_eq!(a.allows(b), a.value() >= b.value());
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::AckDropLedger;
pub use fixtures::{multi_party_signers, TestFixture};

// Re-exported so fixture-based tests rarely need the component crates
// by name.
pub use latchkey_access::AccessLevel;
pub use latchkey_ledger::LocalSigner;
