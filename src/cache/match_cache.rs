use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::models::TenantId;

#[derive(Default)]
struct MatchState {
    generation: u64,
    entries: HashMap<String, Vec<TenantId>>,
}

/// Session-lifetime map from listing id to matched tenants. Never persisted.
///
/// Each `clear` starts a new generation. A fetch records the generation it
/// started in and stores through [`MatchCache::set_if_current`], so results
/// of a fetch that raced with a clear are dropped instead of resurrecting
/// pre-clear state.
#[derive(Default)]
pub struct MatchCache {
    state: RwLock<MatchState>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, listing_id: &str) -> Option<Vec<TenantId>> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.entries.get(listing_id).cloned()
    }

    /// Unconditional store; last write wins
    pub fn set(&self, listing_id: &str, tenant_ids: Vec<TenantId>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.entries.insert(listing_id.to_string(), tenant_ids);
    }

    /// Store only if no `clear` happened since `generation` was read.
    /// Returns whether the entry was stored.
    pub fn set_if_current(&self, generation: u64, listing_id: &str, tenant_ids: Vec<TenantId>) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.generation != generation {
            debug!(listing_id, started = generation, current = state.generation, "discarding match result from before refresh");
            return false;
        }
        state.entries.insert(listing_id.to_string(), tenant_ids);
        true
    }

    pub fn generation(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.entries.clear();
        state.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenants(ids: &[&str]) -> Vec<TenantId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn get_set_clear() {
        let cache = MatchCache::new();
        assert_eq!(cache.get("L1"), None);

        cache.set("L1", tenants(&["t1", "t2"]));
        cache.set("L2", Vec::new());
        assert_eq!(cache.get("L1"), Some(tenants(&["t1", "t2"])));
        assert_eq!(cache.get("L2"), Some(Vec::new()));

        cache.set("L1", tenants(&["t3"]));
        assert_eq!(cache.get("L1"), Some(tenants(&["t3"])));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_fetch_cannot_repopulate_after_clear() {
        let cache = MatchCache::new();
        let started = cache.generation();

        cache.clear();
        assert!(!cache.set_if_current(started, "L1", tenants(&["t1"])));
        assert_eq!(cache.get("L1"), None);

        let fresh = cache.generation();
        assert!(cache.set_if_current(fresh, "L1", tenants(&["t2"])));
        assert_eq!(cache.get("L1"), Some(tenants(&["t2"])));
    }
}
