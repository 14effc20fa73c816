//! Error types for access-control operations.

use thiserror::Error;

use latchkey_core::CoreError;
use latchkey_ledger::LedgerError;

/// Errors that can occur during access-control operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The caller's capability does not authorize the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested access level is outside the accepted range.
    #[error("invalid access level: {0}")]
    InvalidLevel(u8),

    /// A referenced asset, capability, or grant does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A ledger object had the wrong kind or undecodable contents.
    #[error("unexpected ledger object: {0}")]
    InvalidObject(String),

    /// Record encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),

    /// A ledger failure not mapped to a domain meaning.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl AccessError {
    /// Whether the operation may be retried after reconciling by a read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Ledger(e) if e.is_retryable())
    }
}

/// Result type for access-control operations.
pub type Result<T> = std::result::Result<T, AccessError>;
