//! # Latchkey Session
//!
//! Time-boxed session credentials gating cryptographic operations.
//!
//! ## Overview
//!
//! Key servers will not release key shares on the strength of a ledger
//! identity alone; the caller must present a session the identity's
//! owner recently signed. A session is cheap to create, bound to one
//! asset, and expires on a short TTL, so a leaked session limits the
//! blast radius of a compromised browser tab or process.
//!
//! The lifecycle is linear:
//!
//! ```text
//! create (unsigned) ──apply_signature──▶ signed ──used zero or more times──▶ expired
//! ```
//!
//! There is no renewal transition. Expired keys are refused by every
//! consumer, including [`SessionKey::import`].
//!
//! [`SessionToken`] is the portable form: a self-contained record a key
//! server can verify without talking to the session's creator.

pub mod error;
pub mod key;
pub mod manager;
pub mod token;

pub use error::{Result, SessionError};
pub use key::SessionKey;
pub use manager::SessionKeyManager;
pub use token::SessionToken;
