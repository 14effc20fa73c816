//! In-memory blob store for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use latchkey_core::BlobId;

use crate::error::{BlobError, Result};
use crate::traits::{BlobStatus, BlobStore, StoredBlob};

/// Content-addressed in-memory [`BlobStore`].
///
/// Mirrors the remote store's dedup semantics: identical bytes land at the
/// same id, and a repeated upload only extends retention. The store
/// replicates nowhere, so stored means certified.
#[derive(Default)]
pub struct MemoryBlobStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    blobs: HashMap<BlobId, Entry>,
}

struct Entry {
    bytes: Bytes,
    end_epoch: u64,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().blobs.len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Bytes, retention_epochs: u64) -> Result<StoredBlob> {
        let blob_id = BlobId::derive(&bytes);
        let size_bytes = bytes.len() as u64;

        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .blobs
            .entry(blob_id)
            .or_insert_with(|| Entry { bytes, end_epoch: 0 });
        entry.end_epoch = entry.end_epoch.max(retention_epochs);

        Ok(StoredBlob {
            blob_id,
            end_epoch: entry.end_epoch,
            size_bytes,
        })
    }

    async fn download(&self, blob_id: BlobId) -> Result<Vec<u8>> {
        let inner = self.inner.read().unwrap();
        let entry = inner
            .blobs
            .get(&blob_id)
            .ok_or(BlobError::NotFound(blob_id))?;
        Ok(entry.bytes.to_vec())
    }

    async fn status(&self, blob_id: BlobId) -> Result<BlobStatus> {
        let inner = self.inner.read().unwrap();
        Ok(match inner.blobs.get(&blob_id) {
            Some(_) => BlobStatus {
                exists: true,
                certified: true,
            },
            None => BlobStatus::default(),
        })
    }
}
