//! Fault injection for ledger interactions.
//!
//! The pipeline's retry story hinges on one failure shape: the ledger
//! sequences a transaction but the acknowledgement never arrives. The
//! wrapper here produces exactly that, so tests can prove that
//! retrying a step reconciles instead of duplicating on-ledger state.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use latchkey_core::{Ed25519PublicKey, ObjectId, ObjectKind};
use latchkey_ledger::{
    LedgerCall, LedgerClient, LedgerEffects, LedgerError, LedgerObject, Result, Signer,
};

/// A ledger whose next `n` submissions commit but report failure.
///
/// `submit_call` forwards to the inner ledger; while armed, the
/// effects are discarded and a [`LedgerError::Transient`] is returned
/// instead, exactly as if the response was lost on the wire. Reads
/// always pass through untouched.
pub struct AckDropLedger {
    inner: Arc<dyn LedgerClient>,
    drops: AtomicU32,
}

impl AckDropLedger {
    /// Wrap a ledger. Starts disarmed.
    pub fn new(inner: Arc<dyn LedgerClient>) -> Self {
        Self {
            inner,
            drops: AtomicU32::new(0),
        }
    }

    /// Drop the acknowledgements of the next `n` submissions.
    pub fn drop_next_acks(&self, n: u32) {
        self.drops.store(n, Ordering::SeqCst);
    }

    /// How many acknowledgements are still armed to drop.
    pub fn armed(&self) -> u32 {
        self.drops.load(Ordering::SeqCst)
    }

    fn take_drop(&self) -> bool {
        self.drops
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LedgerClient for AckDropLedger {
    async fn submit_call(&self, call: &LedgerCall, signer: &dyn Signer) -> Result<LedgerEffects> {
        let effects = self.inner.submit_call(call, signer).await?;
        if self.take_drop() {
            return Err(LedgerError::Transient(
                "acknowledgement lost after commit".to_string(),
            ));
        }
        Ok(effects)
    }

    async fn query_object(&self, id: ObjectId) -> Result<Option<LedgerObject>> {
        self.inner.query_object(id).await
    }

    async fn query_owned_objects(
        &self,
        owner: &Ed25519PublicKey,
        kind: ObjectKind,
    ) -> Result<Vec<LedgerObject>> {
        self.inner.query_owned_objects(owner, kind).await
    }

    async fn query_dynamic_field(
        &self,
        parent: ObjectId,
        key: &[u8],
    ) -> Result<Option<LedgerObject>> {
        self.inner.query_dynamic_field(parent, key).await
    }
}
