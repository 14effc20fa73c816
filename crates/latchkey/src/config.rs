//! Orchestrator configuration.
//!
//! Defaults are tuned for local development: a 2-of-N quorum, a blob
//! gateway on localhost, and one epoch of retention. Production
//! deployments construct these from their own settings layer.

use serde::{Deserialize, Serialize};

/// Threshold parameters for the encryption quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Minimum key-server shares needed to reconstruct a content key.
    ///
    /// Must be at least 1 and at most the number of configured servers;
    /// the init-encryption step rejects values outside that range.
    pub threshold: u8,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self { threshold: 2 }
    }
}

/// Blob storage parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Public gateway used to build access URLs for stored blobs.
    ///
    /// Only URL construction uses this; uploads go through whatever
    /// [`latchkey_blob::BlobStore`] the orchestrator was built with.
    pub gateway_url: String,

    /// How many epochs stored payloads stay certified.
    pub retention_epochs: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            retention_epochs: 1,
        }
    }
}

/// Configuration for the publishing orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Threshold encryption parameters.
    pub quorum: QuorumConfig,

    /// Blob storage parameters.
    pub blob: BlobConfig,
}

impl OrchestratorConfig {
    /// Override the quorum threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.quorum.threshold = threshold;
        self
    }

    /// Override the blob gateway URL.
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.blob.gateway_url = url.into();
        self
    }

    /// Override the blob retention period.
    pub fn with_retention_epochs(mut self, epochs: u64) -> Self {
        self.blob.retention_epochs = epochs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.quorum.threshold, 2);
        assert_eq!(config.blob.retention_epochs, 1);
        assert!(config.blob.gateway_url.starts_with("http://"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = OrchestratorConfig::default()
            .with_threshold(3)
            .with_gateway_url("https://blobs.example.com")
            .with_retention_epochs(12);

        assert_eq!(config.quorum.threshold, 3);
        assert_eq!(config.blob.gateway_url, "https://blobs.example.com");
        assert_eq!(config.blob.retention_epochs, 12);
    }
}
