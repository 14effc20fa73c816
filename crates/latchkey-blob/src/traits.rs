//! The storage abstraction the publishing pipeline writes through.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use latchkey_core::BlobId;

use crate::error::Result;

/// A durably stored blob, as acknowledged by the store.
///
/// The id is the content address of the bytes, so re-uploading the same
/// payload yields the same `blob_id` (the store reports it as already
/// certified rather than storing a second copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    /// Content address of the stored bytes.
    pub blob_id: BlobId,

    /// Last storage epoch the blob is retained through.
    pub end_epoch: u64,

    /// Size of the stored bytes.
    pub size_bytes: u64,
}

/// Certification status of a blob, as reported by the store.
///
/// A blob can exist but not yet be certified while the store is still
/// replicating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobStatus {
    /// Whether the store knows the blob at all.
    pub exists: bool,

    /// Whether the store has certified the blob as durably replicated.
    pub certified: bool,
}

/// A content-addressed blob store.
///
/// Uploads are idempotent: storing the same bytes twice returns the same
/// [`StoredBlob`]. Downloads of unknown ids fail with
/// [`BlobError::NotFound`](crate::BlobError::NotFound), which callers must
/// treat differently from [`Transient`](crate::BlobError::Transient)
/// failures where the blob may well exist.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` for at least `retention_epochs` storage epochs.
    async fn upload(&self, bytes: Bytes, retention_epochs: u64) -> Result<StoredBlob>;

    /// Fetch the bytes stored at `blob_id`.
    async fn download(&self, blob_id: BlobId) -> Result<Vec<u8>>;

    /// Report whether the store holds (and has certified) `blob_id`.
    ///
    /// An unknown blob is a valid answer (`exists: false`), not an error.
    async fn status(&self, blob_id: BlobId) -> Result<BlobStatus>;
}
