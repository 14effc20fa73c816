//! Ordered access levels.
//!
//! Access is a single ordered integer: holding level k implies every
//! permission of levels below k. Named rungs mark the levels the pipeline
//! itself cares about; anything in between is available to applications.

use serde::{Deserialize, Serialize};
use std::fmt;

use latchkey_ledger::MAX_ACCESS_LEVEL;

use crate::error::{AccessError, Result};

/// An access level in `0..=MAX_ACCESS_LEVEL`.
///
/// Level 0 means no access; grants always carry a level of at least 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccessLevel(u8);

impl AccessLevel {
    /// No access. The answer for principals with no grant.
    pub const NONE: AccessLevel = AccessLevel(0);

    /// May see that the asset exists and read its metadata.
    pub const VIEW: AccessLevel = AccessLevel(1);

    /// May obtain key shares and decrypt published payloads.
    pub const DECRYPT: AccessLevel = AccessLevel(4);

    /// May manage grants for other principals.
    pub const MANAGE: AccessLevel = AccessLevel(8);

    /// Full control, the highest level the program accepts.
    pub const MAX: AccessLevel = AccessLevel(MAX_ACCESS_LEVEL);

    /// Validate a raw level.
    pub fn new(value: u8) -> Result<Self> {
        if value > MAX_ACCESS_LEVEL {
            return Err(AccessError::InvalidLevel(value));
        }
        Ok(Self(value))
    }

    /// The raw level value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether this level includes everything `other` permits.
    pub fn allows(&self, other: AccessLevel) -> bool {
        *self >= other
    }

    /// Whether this level clears the decryption rung.
    pub fn can_decrypt(&self) -> bool {
        self.allows(AccessLevel::DECRYPT)
    }
}

impl fmt::Debug for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessLevel({})", self.0)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
