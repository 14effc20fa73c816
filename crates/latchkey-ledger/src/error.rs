//! Error types for ledger operations.

use std::fmt;
use thiserror::Error;

use latchkey_core::CoreError;

/// Typed reasons a ledger transaction can be rejected.
///
/// Callers match on the reason instead of parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The signer does not own the target object.
    NotOwner,

    /// The target object does not exist.
    NotFound,

    /// A capability or other time-bounded object has expired.
    Expired,

    /// An argument failed the entry point's checks.
    InvalidArgument,

    /// Any other program-level rejection.
    Other,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::NotOwner => "not owner",
            RejectReason::NotFound => "not found",
            RejectReason::Expired => "expired",
            RejectReason::InvalidArgument => "invalid argument",
            RejectReason::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Errors that can occur when talking to the ledger.
///
/// `Rejected` is a definitive program-level outcome and must never be
/// blindly retried; `Transient` is safe to retry after reconciling state
/// by a read.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The transaction was sequenced and the program rejected it.
    #[error("ledger rejected transaction ({reason}): {message}")]
    Rejected {
        reason: RejectReason,
        message: String,
    },

    /// The submission outcome is unknown (timeout, connection loss).
    #[error("transient ledger failure: {0}")]
    Transient(String),

    /// The signer declined or failed to sign the transaction.
    #[error("signer rejected: {0}")]
    SignerRejected(String),

    /// Transaction or object bytes failed to encode or decode.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),
}

impl LedgerError {
    /// Construct a program-level rejection.
    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        LedgerError::Rejected {
            reason,
            message: message.into(),
        }
    }

    /// Whether retrying the same submission can be correct.
    ///
    /// Retries must be preceded by a read to check whether the earlier
    /// attempt actually landed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }

    /// The typed rejection reason, if this is a rejection.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            LedgerError::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
