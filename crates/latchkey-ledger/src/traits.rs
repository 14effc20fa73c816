//! The abstract ledger and signer interfaces.
//!
//! Everything above this crate talks to the ledger through
//! [`LedgerClient`] and signs through [`Signer`]; both are injected by
//! constructors, never reached through globals. Implementations include
//! the in-memory ledger (tests) and RPC-backed clients.

use async_trait::async_trait;

use latchkey_core::{Ed25519PublicKey, Ed25519Signature, Keypair, ObjectId, ObjectKind};

use crate::call::LedgerCall;
use crate::effects::{LedgerEffects, LedgerObject};
use crate::error::Result;

/// An opaque signing capability for one principal.
///
/// The pipeline never sees private key material; a wallet, a remote
/// signing service, and a local keypair all fit behind this trait.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The principal this signer acts for.
    fn address(&self) -> Ed25519PublicKey;

    /// Sign arbitrary message bytes.
    ///
    /// Fails with `SignerRejected` when the holder declines.
    async fn sign_message(&self, message: &[u8]) -> Result<Ed25519Signature>;
}

/// A signer backed by a local in-process keypair.
///
/// Used by tests and command-line tools; production deployments inject
/// wallet-backed implementations instead.
pub struct LocalSigner {
    keypair: Keypair,
}

impl LocalSigner {
    /// Wrap an existing keypair.
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Generate a fresh random identity.
    pub fn random() -> Self {
        Self {
            keypair: Keypair::generate(),
        }
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Ed25519Signature> {
        Ok(self.keypair.sign(message))
    }
}

/// The ledger interface: submit transactions, read objects.
///
/// # Design Notes
///
/// - **At-least-once submission, exactly-once effects**: a transaction may
///   be submitted repeatedly, but the ledger sequences it at most once.
///   A `Transient` error means the outcome is unknown; callers reconcile
///   by reading before retrying.
/// - **Reads are authoritative**: authorization decisions are made from
///   fresh queries, never from cached copies of objects.
/// - **Rejections are typed**: program-level failures carry a
///   [`crate::RejectReason`] so callers branch on causes, not strings.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a call, signed by `signer`, and wait for its effects.
    async fn submit_call(&self, call: &LedgerCall, signer: &dyn Signer) -> Result<LedgerEffects>;

    /// Fetch an object by address. `None` when it does not exist.
    async fn query_object(&self, id: ObjectId) -> Result<Option<LedgerObject>>;

    /// List the objects of one kind owned by a principal's address.
    async fn query_owned_objects(
        &self,
        owner: &Ed25519PublicKey,
        kind: ObjectKind,
    ) -> Result<Vec<LedgerObject>>;

    /// Fetch a dynamic field attached to a parent object.
    ///
    /// Grant records live here, keyed by grantee public key bytes.
    async fn query_dynamic_field(
        &self,
        parent: ObjectId,
        key: &[u8],
    ) -> Result<Option<LedgerObject>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_signer_signs_verifiably() {
        let signer = LocalSigner::random();
        let message = b"call bytes";
        let signature = signer.sign_message(message).await.unwrap();
        assert!(signer.address().verify(message, &signature).is_ok());
    }

    #[tokio::test]
    async fn test_local_signer_address_stable() {
        let signer = LocalSigner::new(Keypair::from_seed(&[0x11; 32]));
        assert_eq!(signer.address(), signer.address());
    }
}
