//! HTTP client for a remote content-addressed blob store.
//!
//! Wire surface:
//! - `PUT /v1/blobs?epochs=N` with the raw bytes as body. The store answers
//!   with a `newlyCreated` or `alreadyCertified` envelope; both mean the
//!   bytes are durably stored.
//! - `GET /v1/blobs/{blob_id}` returns the raw bytes.
//! - `GET /v1/{blob_id}/status` reports certification.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use latchkey_core::BlobId;

use crate::error::{BlobError, Result};
use crate::traits::{BlobStatus, BlobStore, StoredBlob};

/// Configuration for [`HttpBlobClient`].
#[derive(Clone, Debug)]
pub struct HttpBlobConfig {
    /// Base URL of the blob store.
    pub endpoint: String,

    /// Per-request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

impl Default for HttpBlobConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            timeout_seconds: Some(30),
        }
    }
}

impl HttpBlobConfig {
    /// Create a configuration for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
    end_epoch: u64,
}

/// Store answer to an upload. Both variants mean the bytes are stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum UploadResponse {
    /// First upload of these bytes.
    #[serde(rename_all = "camelCase")]
    NewlyCreated { blob_object: BlobObject },

    /// The store already held these bytes; retention may have been extended.
    #[serde(rename_all = "camelCase")]
    AlreadyCertified { blob_id: String, end_epoch: u64 },
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    certified: bool,
}

fn http_failure(status: StatusCode, body: String) -> BlobError {
    if status.is_server_error() {
        BlobError::Transient(format!(
            "HTTP {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown")
        ))
    } else {
        BlobError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

/// [`BlobStore`] backed by a remote HTTP blob store.
///
/// The store is content-addressed: the client derives the expected
/// [`BlobId`] locally and refuses answers that disagree, so a corrupted
/// upload acknowledgement or download body surfaces as
/// [`BlobError::Response`] instead of silently propagating bad bytes.
#[derive(Clone)]
pub struct HttpBlobClient {
    config: HttpBlobConfig,
    client: Client,
}

impl HttpBlobClient {
    /// Create a client for the configured store.
    pub fn new(config: HttpBlobConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }
        let client = builder.build().map_err(|e| BlobError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn base(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    fn store_url(&self) -> String {
        format!("{}/v1/blobs", self.base())
    }

    fn blob_url(&self, blob_id: BlobId) -> String {
        format!("{}/v1/blobs/{}", self.base(), blob_id.to_hex())
    }

    fn status_url(&self, blob_id: BlobId) -> String {
        format!("{}/v1/{}/status", self.base(), blob_id.to_hex())
    }
}

#[async_trait]
impl BlobStore for HttpBlobClient {
    async fn upload(&self, bytes: Bytes, retention_epochs: u64) -> Result<StoredBlob> {
        let expected = BlobId::derive(&bytes);
        let size_bytes = bytes.len() as u64;

        let response = self
            .client
            .put(self.store_url())
            .query(&[("epochs", retention_epochs)])
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_failure(status, body));
        }

        let body = response.bytes().await?;
        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| BlobError::Response(format!("upload envelope: {e}")))?;

        let (reported, end_epoch, deduplicated) = match parsed {
            UploadResponse::NewlyCreated { blob_object } => {
                (blob_object.blob_id, blob_object.end_epoch, false)
            }
            UploadResponse::AlreadyCertified { blob_id, end_epoch } => (blob_id, end_epoch, true),
        };

        let blob_id =
            BlobId::from_hex(&reported).map_err(|e| BlobError::Response(format!("blob id: {e}")))?;
        if blob_id != expected {
            return Err(BlobError::Response(format!(
                "store reported blob id {blob_id}, content derives {expected}"
            )));
        }

        tracing::debug!(blob_id = %blob_id, end_epoch, deduplicated, "blob stored");

        Ok(StoredBlob {
            blob_id,
            end_epoch,
            size_bytes,
        })
    }

    async fn download(&self, blob_id: BlobId) -> Result<Vec<u8>> {
        let response = self.client.get(self.blob_url(blob_id)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(blob_id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_failure(status, body));
        }

        let bytes = response.bytes().await?;
        if BlobId::derive(&bytes) != blob_id {
            return Err(BlobError::Response(
                "downloaded bytes do not match the blob id".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }

    async fn status(&self, blob_id: BlobId) -> Result<BlobStatus> {
        let response = self.client.get(self.status_url(blob_id)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(BlobStatus::default());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_failure(status, body));
        }

        let body = response.bytes().await?;
        let parsed: StatusResponse = serde_json::from_slice(&body)
            .map_err(|e| BlobError::Response(format!("status body: {e}")))?;
        Ok(BlobStatus {
            exists: true,
            certified: parsed.certified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client_for(server: &mockito::ServerGuard) -> HttpBlobClient {
        HttpBlobClient::new(HttpBlobConfig::new(server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_upload_newly_created() {
        let mut server = Server::new_async().await;
        let payload = Bytes::from_static(b"the quick brown payload");
        let id_hex = BlobId::derive(&payload).to_hex();

        let body =
            format!(r#"{{"newlyCreated":{{"blobObject":{{"blobId":"{id_hex}","endEpoch":7}}}}}}"#);
        let mock = server
            .mock("PUT", "/v1/blobs?epochs=3")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let stored = client.upload(payload.clone(), 3).await.unwrap();
        mock.assert_async().await;

        assert_eq!(stored.blob_id, BlobId::derive(&payload));
        assert_eq!(stored.end_epoch, 7);
        assert_eq!(stored.size_bytes, payload.len() as u64);
    }

    #[tokio::test]
    async fn test_upload_already_certified() {
        let mut server = Server::new_async().await;
        let payload = Bytes::from_static(b"seen these bytes before");
        let id_hex = BlobId::derive(&payload).to_hex();

        let body = format!(r#"{{"alreadyCertified":{{"blobId":"{id_hex}","endEpoch":12}}}}"#);
        let mock = server
            .mock("PUT", "/v1/blobs?epochs=5")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let stored = client.upload(payload.clone(), 5).await.unwrap();
        mock.assert_async().await;

        assert_eq!(stored.blob_id, BlobId::derive(&payload));
        assert_eq!(stored.end_epoch, 12);
        assert_eq!(stored.size_bytes, payload.len() as u64);
    }

    #[tokio::test]
    async fn test_upload_rejects_mismatched_id() {
        let mut server = Server::new_async().await;
        let wrong_hex = BlobId::from_bytes([0u8; 32]).to_hex();

        let body = format!(r#"{{"alreadyCertified":{{"blobId":"{wrong_hex}","endEpoch":1}}}}"#);
        let _mock = server
            .mock("PUT", "/v1/blobs?epochs=1")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .upload(Bytes::from_static(b"honest bytes"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Response(_)));
    }

    #[tokio::test]
    async fn test_upload_server_error_is_retryable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/v1/blobs?epochs=1")
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .upload(Bytes::from_static(b"unlucky bytes"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Transient(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_upload_client_error_is_permanent() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/v1/blobs?epochs=0")
            .with_status(400)
            .with_body("retention must be positive")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .upload(Bytes::from_static(b"zero epochs"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Rejected { status: 400, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_download_returns_bytes() {
        let mut server = Server::new_async().await;
        let payload = b"stored earlier";
        let blob_id = BlobId::derive(payload);

        let mock = server
            .mock("GET", format!("/v1/blobs/{}", blob_id.to_hex()).as_str())
            .with_status(200)
            .with_body(payload)
            .create_async()
            .await;

        let client = client_for(&server);
        let bytes = client.download(blob_id).await.unwrap();
        mock.assert_async().await;

        assert_eq!(bytes, payload);
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let mut server = Server::new_async().await;
        let blob_id = BlobId::derive(b"never uploaded");

        let _mock = server
            .mock("GET", format!("/v1/blobs/{}", blob_id.to_hex()).as_str())
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.download(blob_id).await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(id) if id == blob_id));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_download_rejects_corrupt_body() {
        let mut server = Server::new_async().await;
        let blob_id = BlobId::derive(b"original bytes");

        let _mock = server
            .mock("GET", format!("/v1/blobs/{}", blob_id.to_hex()).as_str())
            .with_status(200)
            .with_body(b"tampered bytes")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.download(blob_id).await.unwrap_err();
        assert!(matches!(err, BlobError::Response(_)));
    }

    #[tokio::test]
    async fn test_status_reports_certification() {
        let mut server = Server::new_async().await;
        let blob_id = BlobId::derive(b"certified bytes");

        let _mock = server
            .mock("GET", format!("/v1/{}/status", blob_id.to_hex()).as_str())
            .with_status(200)
            .with_body(r#"{"certified":true}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let status = client.status(blob_id).await.unwrap();
        assert!(status.exists);
        assert!(status.certified);
    }

    #[tokio::test]
    async fn test_status_missing_blob_is_not_an_error() {
        let mut server = Server::new_async().await;
        let blob_id = BlobId::derive(b"unknown bytes");

        let _mock = server
            .mock("GET", format!("/v1/{}/status", blob_id.to_hex()).as_str())
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let status = client.status(blob_id).await.unwrap();
        assert!(!status.exists);
        assert!(!status.certified);
    }
}
