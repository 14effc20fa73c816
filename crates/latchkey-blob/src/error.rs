//! Error types for blob store operations.

use thiserror::Error;

use latchkey_core::BlobId;

/// Errors that can occur while talking to a blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob does not exist in the store.
    #[error("blob {0} not found")]
    NotFound(BlobId),

    /// The store could not be reached or answered too late.
    ///
    /// Covers connection failures, timeouts, and 5xx answers. The request
    /// may have landed; callers reconcile by a read before re-uploading.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The store refused the request outright.
    #[error("store rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The store answered with something we could not interpret.
    #[error("malformed store response: {0}")]
    Response(String),

    /// The HTTP client could not be constructed or the request built.
    #[error("http client error: {0}")]
    Client(String),
}

impl BlobError {
    /// Whether the operation may be retried after reconciling by a read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlobError::Transient(_))
    }
}

impl From<reqwest::Error> for BlobError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            BlobError::Client(err.to_string())
        } else if err.is_decode() {
            BlobError::Response(err.to_string())
        } else {
            // Connection failures, timeouts, and anything else on the wire.
            BlobError::Transient(err.to_string())
        }
    }
}

/// Result type for blob store operations.
pub type Result<T> = std::result::Result<T, BlobError>;
