//! Threshold encryption against a key-server quorum.
//!
//! Encryption splits a fresh secret across all N servers; decryption
//! needs any `threshold` of them to release their shares. The servers,
//! not the engine, decide whether a caller is authorized: each one
//! independently re-reads the caller's grant, so authorization reflects
//! the ledger's current state at decrypt time, not at encrypt time.

use std::sync::Arc;

use curve25519_dalek::scalar::Scalar;
use futures::stream::{FuturesUnordered, StreamExt};
use zeroize::Zeroizing;

use latchkey_core::now_millis;
use latchkey_session::{SessionKey, SessionToken};

use crate::cipher::{derive_content_key, EncryptionNonce};
use crate::error::{Result, ThresholdError};
use crate::policy::{EncryptedPayload, EncryptionFormat, PolicyId};
use crate::server::{KeyServer, KeyShare, ServerStatus};
use crate::shamir::{interpolate_at_zero, server_id_to_scalar, SecretPolynomial, SharePoint};

/// Coordinates the key-server quorum for encrypt and decrypt.
pub struct ThresholdEncryptionEngine {
    servers: Vec<Arc<dyn KeyServer>>,
}

impl ThresholdEncryptionEngine {
    /// Create an engine over a fixed, allow-listed quorum.
    ///
    /// Panics on a zero or duplicate server id; the quorum shape is
    /// assembled in code, not taken from untrusted input.
    pub fn new(servers: Vec<Arc<dyn KeyServer>>) -> Self {
        let mut seen = std::collections::BTreeSet::new();
        for server in &servers {
            let id = server.server_id();
            assert!(id != 0, "server id 0 is reserved");
            assert!(seen.insert(id), "duplicate server id {}", id);
        }
        Self { servers }
    }

    /// Number of servers in the quorum.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Check that `threshold` fits this quorum: `1 <= threshold <= N`.
    pub fn check_threshold(&self, threshold: u8) -> Result<()> {
        if threshold == 0 || threshold as usize > self.servers.len() {
            return Err(ThresholdError::InvalidThreshold {
                threshold,
                servers: self.servers.len(),
            });
        }
        Ok(())
    }

    /// Probe every server in the quorum.
    ///
    /// Encryption registers a share with all N servers, so a single
    /// unreachable server fails the preflight. Statuses come back in
    /// quorum order.
    pub async fn preflight(&self) -> Result<Vec<ServerStatus>> {
        let probes = self.servers.iter().map(|server| {
            let server_id = server.server_id();
            async move {
                server
                    .status()
                    .await
                    .map_err(|e| ThresholdError::ServerUnavailable {
                        server_id,
                        reason: e.to_string(),
                    })
            }
        });
        futures::future::try_join_all(probes).await
    }

    /// Encrypt `plaintext` under a policy, requiring `threshold` of the
    /// quorum's servers to later reconstruct.
    ///
    /// No session is needed: anyone may encrypt for a policy. All N
    /// servers must accept their share registration; a partially
    /// registered policy is treated as a failed encrypt and the
    /// ciphertext is discarded.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        policy: PolicyId,
        threshold: u8,
    ) -> Result<EncryptedPayload> {
        self.check_threshold(threshold)?;

        let secret = Zeroizing::new(Scalar::random(&mut rand::thread_rng()));
        let polynomial = SecretPolynomial::from_secret(*secret, threshold, &mut rand::thread_rng());

        let content_key = derive_content_key(&secret, &policy);
        let nonce = EncryptionNonce::generate();
        let ciphertext = content_key.encrypt(plaintext, &nonce)?;

        let registrations = self.servers.iter().map(|server| {
            let server_id = server.server_id();
            let share = KeyShare {
                server_id,
                value: polynomial.evaluate(server_id_to_scalar(server_id)),
            };
            async move {
                server
                    .register_share(&policy, share)
                    .await
                    .map_err(|e| ThresholdError::RegistrationFailed {
                        server_id,
                        reason: e.to_string(),
                    })
            }
        });
        futures::future::try_join_all(registrations).await?;

        tracing::debug!(asset = %policy.asset_id, threshold, "payload encrypted");
        Ok(EncryptedPayload {
            format: EncryptionFormat::ChaCha20Poly1305,
            policy_id: policy,
            threshold,
            source_size: plaintext.len() as u64,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt a payload using a signed, unexpired session.
    ///
    /// Shares are requested from all servers concurrently; the engine
    /// proceeds as soon as `threshold` arrive and drops the rest of the
    /// in-flight requests. Fails with `Unauthorized` when too few
    /// servers approve, and with `SessionExpired` if the session lapses
    /// before the shares are in.
    pub async fn decrypt(
        &self,
        payload: &EncryptedPayload,
        session: &SessionKey,
    ) -> Result<Vec<u8>> {
        self.check_threshold(payload.threshold)?;
        if session.is_expired(now_millis()) {
            return Err(ThresholdError::SessionExpired);
        }
        let token = SessionToken::from_key(session)?;

        let needed = payload.threshold as usize;
        let policy = payload.policy_id;

        let mut pending: FuturesUnordered<_> = self
            .servers
            .iter()
            .map(|server| {
                let token = token.clone();
                async move { server.fetch_share(&policy, &token).await }
            })
            .collect();

        let mut points: Vec<SharePoint> = Vec::with_capacity(needed);
        while let Some(result) = pending.next().await {
            match result {
                Ok(share) => {
                    points.push(share.to_point());
                    if points.len() >= needed {
                        break;
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "key server refused share");
                }
            }
        }
        // Cancels whatever is still in flight.
        drop(pending);

        if points.len() < needed {
            return Err(ThresholdError::Unauthorized {
                approvals: points.len(),
                threshold: payload.threshold,
            });
        }
        if session.is_expired(now_millis()) {
            return Err(ThresholdError::SessionExpired);
        }

        let secret = Zeroizing::new(interpolate_at_zero(&points)?);
        let content_key = derive_content_key(&secret, &payload.policy_id);
        content_key.decrypt(&payload.ciphertext, &payload.nonce)
    }
}
