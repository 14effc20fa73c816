//! # Latchkey Blob
//!
//! Content-addressed blob storage, the durable sink of the publishing
//! pipeline.
//!
//! A blob's id is derived from its bytes, so uploads deduplicate and a
//! repeated upload after an ambiguous failure is harmless: the store
//! answers "already certified" for bytes it has seen, and both that and
//! "newly created" count as success. Downloads verify the fetched bytes
//! against the requested id before handing them back.
//!
//! Two implementations of [`BlobStore`] are provided:
//!
//! - [`HttpBlobClient`] — a remote store spoken to over HTTP, with
//!   timeouts and 5xx answers reported as retryable
//!   [`BlobError::Transient`] failures, distinct from a definitive
//!   [`BlobError::NotFound`].
//! - [`MemoryBlobStore`] — an in-process twin with identical semantics.
//!
//! ```rust
//! use bytes::Bytes;
//! use latchkey_blob::{BlobStore, MemoryBlobStore};
//!
//! # async fn demo() -> latchkey_blob::Result<()> {
//! let store = MemoryBlobStore::new();
//! let stored = store.upload(Bytes::from_static(b"ciphertext"), 5).await?;
//! let bytes = store.download(stored.blob_id).await?;
//! assert_eq!(bytes, b"ciphertext");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use error::{BlobError, Result};
pub use http::{HttpBlobClient, HttpBlobConfig};
pub use memory::MemoryBlobStore;
pub use traits::{BlobStatus, BlobStore, StoredBlob};
