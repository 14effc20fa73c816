//! In-memory index of known capabilities.
//!
//! The store is a pure data structure: callers feed it capabilities
//! fetched from the ledger and query it locally. It never talks to the
//! ledger itself, so lookups are cheap and deterministic.

use std::collections::HashMap;

use latchkey_core::ObjectId;

use crate::types::AccessCapability;

/// Index of capabilities, keyed by id and by administered asset.
///
/// Multiple capabilities for the same asset may coexist (the owner can
/// create as many as they like); [`CapabilityStore::effective_for_asset`]
/// picks one deterministically.
#[derive(Debug, Default)]
pub struct CapabilityStore {
    /// All capabilities indexed by object id.
    capabilities: HashMap<ObjectId, AccessCapability>,

    /// Index: asset -> capability ids administering it.
    by_asset: HashMap<ObjectId, Vec<ObjectId>>,
}

impl CapabilityStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a capability, replacing any previous entry with the same id.
    pub fn insert(&mut self, capability: AccessCapability) {
        let ids = self.by_asset.entry(capability.asset_id).or_default();
        if !ids.contains(&capability.id) {
            ids.push(capability.id);
        }
        self.capabilities.insert(capability.id, capability);
    }

    /// Get a capability by id.
    pub fn get(&self, id: &ObjectId) -> Option<&AccessCapability> {
        self.capabilities.get(id)
    }

    /// Remove a capability by id.
    pub fn remove(&mut self, id: &ObjectId) -> Option<AccessCapability> {
        let capability = self.capabilities.remove(id)?;
        if let Some(ids) = self.by_asset.get_mut(&capability.asset_id) {
            ids.retain(|entry| entry != id);
            if ids.is_empty() {
                self.by_asset.remove(&capability.asset_id);
            }
        }
        Some(capability)
    }

    /// List all capabilities administering an asset.
    pub fn for_asset(&self, asset_id: &ObjectId) -> Vec<&AccessCapability> {
        self.by_asset
            .get(asset_id)
            .map(|ids| ids.iter().filter_map(|id| self.capabilities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Pick the effective capability for an asset at `now`.
    ///
    /// Expired capabilities are skipped. When several are usable the one
    /// with the smallest id wins, so repeated calls agree regardless of
    /// insertion order.
    pub fn effective_for_asset(&self, asset_id: &ObjectId, now: i64) -> Option<&AccessCapability> {
        self.for_asset(asset_id)
            .into_iter()
            .filter(|capability| !capability.is_expired(now))
            .min_by_key(|capability| capability.id)
    }

    /// Number of capabilities in the store.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
