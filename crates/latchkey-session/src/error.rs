//! Error types for session credentials.

use thiserror::Error;

use latchkey_core::CoreError;
use latchkey_ledger::LedgerError;

/// Errors from session-key operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session key's lifetime has passed.
    #[error("session key expired at {expires_at}")]
    Expired {
        /// When the key stopped being usable (Unix milliseconds).
        expires_at: i64,
    },

    /// A signature did not match the key's challenge message.
    #[error("signature does not match the session challenge")]
    SignatureMismatch,

    /// The operation requires a signed session key.
    #[error("session key has not been signed")]
    NotSigned,

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),

    /// The signer refused or failed to produce a signature.
    #[error("signer error: {0}")]
    Signer(#[from] LedgerError),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
