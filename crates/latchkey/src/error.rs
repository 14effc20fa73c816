//! Error types for the publishing pipeline.

use latchkey_access::AccessError;
use latchkey_blob::BlobError;
use latchkey_core::JourneyId;
use latchkey_session::SessionError;
use latchkey_threshold::ThresholdError;
use thiserror::Error;

use crate::journey::StepId;
use crate::store::StoreError;

/// Errors surfaced by the publishing orchestrator.
///
/// Component failures are wrapped, not flattened: callers that need the
/// cause branch on the inner enum, everyone else checks
/// [`PublishError::is_retryable`] and either retries the step or
/// reports the journey as stuck.
#[derive(Error, Debug)]
pub enum PublishError {
    /// An access-control operation failed.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// A session key operation failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A threshold encryption operation failed.
    #[error("encryption error: {0}")]
    Threshold(#[from] ThresholdError),

    /// A blob storage operation failed.
    #[error("blob error: {0}")]
    Blob(#[from] BlobError),

    /// Journey persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No journey with this id exists in memory or in the store.
    #[error("journey {0} not found")]
    JourneyNotFound(JourneyId),

    /// Every step of the journey has already completed.
    #[error("journey {0} is already complete")]
    JourneyComplete(JourneyId),

    /// A step was requested out of sequence.
    #[error("step out of order: expected {expected}, requested {requested}")]
    StepOutOfOrder {
        /// The first incomplete step, the only one runnable now.
        expected: StepId,
        /// The step the caller asked for.
        requested: StepId,
    },

    /// Another call is already running a step of this journey.
    #[error("a step of journey {0} is already in progress")]
    StepInProgress(JourneyId),

    /// The operation does not make sense for the journey's state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl PublishError {
    /// Whether retrying the same step can succeed.
    ///
    /// True only for transient transport failures inside a component.
    /// After a retryable failure the step's outcome may still have
    /// landed; steps that write reconcile by reading before retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            PublishError::Access(e) => e.is_retryable(),
            PublishError::Session(SessionError::Signer(e)) => e.is_retryable(),
            PublishError::Threshold(e) => e.is_retryable(),
            PublishError::Blob(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PublishError>;
