//! Transaction calls against published ledger entry points.
//!
//! A [`LedgerCall`] names an entry point and carries typed positional
//! arguments. The canonical CBOR encoding of the call is what the signer
//! signs; every client implementation must produce the same bytes for the
//! same call.

use serde::{Deserialize, Serialize};

use latchkey_core::{to_canonical_bytes, CoreError, Ed25519PublicKey, ObjectId};

/// Entry points of the access-control program.
pub mod entry {
    /// Mint an ownership token for a new asset.
    pub const ASSET_MINT: &str = "asset::mint";
    /// Create a delegatable capability over an owned asset.
    pub const CAPABILITY_CREATE: &str = "access::create_capability";
    /// Grant a principal an access level on an asset.
    pub const ACCESS_GRANT: &str = "access::grant";
    /// Remove a principal's grant on an asset.
    pub const ACCESS_REVOKE: &str = "access::revoke";
}

/// A typed positional argument to an entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    /// A ledger object address.
    Object(ObjectId),

    /// A principal's public key.
    PublicKey(Ed25519PublicKey),

    /// A small unsigned integer (access levels).
    U8(u8),

    /// A millisecond timestamp.
    I64(i64),

    /// A UTF-8 string (titles, labels).
    Text(String),
}

/// A transaction call: entry point plus arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerCall {
    /// The entry point to invoke, e.g. `access::grant`.
    pub entry_point: String,

    /// Positional arguments.
    pub args: Vec<CallArg>,
}

impl LedgerCall {
    /// Start a call to the named entry point.
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            args: Vec::new(),
        }
    }

    /// Append an object argument.
    pub fn object(mut self, id: ObjectId) -> Self {
        self.args.push(CallArg::Object(id));
        self
    }

    /// Append a public key argument.
    pub fn public_key(mut self, key: Ed25519PublicKey) -> Self {
        self.args.push(CallArg::PublicKey(key));
        self
    }

    /// Append a u8 argument.
    pub fn u8(mut self, value: u8) -> Self {
        self.args.push(CallArg::U8(value));
        self
    }

    /// Append a millisecond timestamp argument.
    pub fn i64(mut self, value: i64) -> Self {
        self.args.push(CallArg::I64(value));
        self
    }

    /// Append a text argument.
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.args.push(CallArg::Text(value.into()));
        self
    }

    /// Get an argument by position.
    pub fn arg(&self, index: usize) -> Option<&CallArg> {
        self.args.get(index)
    }

    /// The bytes a signer signs: canonical CBOR of the whole call.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, CoreError> {
        to_canonical_bytes(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_builder_positions() {
        let asset = ObjectId::from_bytes([1; 32]);
        let grantee = Ed25519PublicKey::from_bytes([2; 32]);

        let call = LedgerCall::new(entry::ACCESS_GRANT)
            .object(asset)
            .public_key(grantee)
            .u8(4);

        assert_eq!(call.entry_point, entry::ACCESS_GRANT);
        assert_eq!(call.arg(0), Some(&CallArg::Object(asset)));
        assert_eq!(call.arg(1), Some(&CallArg::PublicKey(grantee)));
        assert_eq!(call.arg(2), Some(&CallArg::U8(4)));
        assert_eq!(call.arg(3), None);
    }

    #[test]
    fn test_signing_bytes_deterministic() {
        let make = || {
            LedgerCall::new(entry::ASSET_MINT)
                .text("workflow")
                .i64(1736870400000)
        };
        let a = make().signing_bytes().unwrap();
        let b = make().signing_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signing_bytes_differ_by_args() {
        let a = LedgerCall::new(entry::ASSET_MINT)
            .text("one")
            .signing_bytes()
            .unwrap();
        let b = LedgerCall::new(entry::ASSET_MINT)
            .text("two")
            .signing_bytes()
            .unwrap();
        assert_ne!(a, b);
    }
}
