//! Error types for threshold encryption.

use thiserror::Error;

use latchkey_ledger::LedgerError;
use latchkey_session::SessionError;

/// Errors from threshold encryption and the key-server quorum.
#[derive(Debug, Error)]
pub enum ThresholdError {
    /// The requested threshold does not fit the quorum.
    #[error("threshold {threshold} invalid for a quorum of {servers} servers")]
    InvalidThreshold {
        /// The requested minimum number of shares.
        threshold: u8,
        /// How many servers the quorum has.
        servers: usize,
    },

    /// A key server failed to register its share at encrypt time.
    #[error("key server {server_id} failed to register share: {reason}")]
    RegistrationFailed {
        /// The failing server.
        server_id: u8,
        /// What went wrong.
        reason: String,
    },

    /// A key server did not answer a status probe.
    #[error("key server {server_id} unavailable: {reason}")]
    ServerUnavailable {
        /// The unresponsive server.
        server_id: u8,
        /// What went wrong.
        reason: String,
    },

    /// Too few key servers released their shares.
    #[error("quorum refused: {approvals} of {threshold} required approvals")]
    Unauthorized {
        /// How many servers approved.
        approvals: usize,
        /// How many approvals were required.
        threshold: u8,
    },

    /// The session key lapsed before or during the operation.
    #[error("session key expired during the operation")]
    SessionExpired,

    /// The session credential was unusable for another reason.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A key server declined to release its share.
    #[error("share refused: {0}")]
    ShareRefused(String),

    /// The ciphertext is structurally corrupt or fails authentication.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Symmetric encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// A ledger read failed while checking authorization.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ThresholdError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_retryable(),
            Self::ServerUnavailable { .. } => true,
            _ => false,
        }
    }
}

/// Result type for threshold operations.
pub type Result<T> = std::result::Result<T, ThresholdError>;
