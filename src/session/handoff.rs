use std::sync::Arc;

use tracing::warn;

use crate::error::{CacheError, Result};
use crate::models::{ListingRecord, UserProfile};
use crate::storage::{read_json, write_json, DurableStorage, SELECTED_LISTING_KEY, USER_INFO_KEY};

/// Small single-value entries that outlive a view: the listing picked in a
/// list view and the signed-in user's profile.
pub struct LocalState {
    storage: Arc<dyn DurableStorage>,
}

impl LocalState {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    pub fn select_listing(&self, record: &ListingRecord) -> Result<()> {
        write_json(self.storage.as_ref(), SELECTED_LISTING_KEY, record)
    }

    /// The handed-off listing; an entry that no longer validates is dropped
    pub fn selected_listing(&self) -> Result<Option<ListingRecord>> {
        let value = match read_json::<serde_json::Value>(self.storage.as_ref(), SELECTED_LISTING_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(CacheError::Storage(reason)) => {
                warn!(%reason, "discarding unreadable selected listing");
                self.storage.remove(SELECTED_LISTING_KEY)?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match ListingRecord::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(reason) => {
                warn!(%reason, "discarding malformed selected listing");
                self.storage.remove(SELECTED_LISTING_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn cached_profile(&self) -> Result<Option<UserProfile>> {
        match read_json(self.storage.as_ref(), USER_INFO_KEY) {
            Ok(profile) => Ok(profile),
            Err(CacheError::Storage(reason)) => {
                warn!(%reason, "discarding unreadable cached profile");
                self.storage.remove(USER_INFO_KEY)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn store_profile(&self, profile: &UserProfile) -> Result<()> {
        write_json(self.storage.as_ref(), USER_INFO_KEY, profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::listing;
    use crate::storage::InMemoryStorage;

    #[test]
    fn selected_listing_round_trip() {
        let storage = InMemoryStorage::new();
        let state = LocalState::new(Arc::new(storage.clone()));
        assert_eq!(state.selected_listing().unwrap(), None);

        let record = listing("L1", 1.0);
        state.select_listing(&record).unwrap();
        assert_eq!(state.selected_listing().unwrap(), Some(record));
    }

    #[test]
    fn malformed_selection_is_dropped() {
        let storage = InMemoryStorage::new();
        storage.write(SELECTED_LISTING_KEY, r#"{"listingId":"L1"}"#).unwrap();
        let state = LocalState::new(Arc::new(storage.clone()));

        assert_eq!(state.selected_listing().unwrap(), None);
        assert!(storage.read(SELECTED_LISTING_KEY).unwrap().is_none());
    }

    #[test]
    fn profile_cache() {
        let storage = InMemoryStorage::new();
        let state = LocalState::new(Arc::new(storage.clone()));
        let profile = UserProfile {
            name: "Asha".into(),
            email_id: "asha@example.com".into(),
            ..Default::default()
        };
        state.store_profile(&profile).unwrap();
        assert_eq!(state.cached_profile().unwrap(), Some(profile));

        storage.write(USER_INFO_KEY, "nope").unwrap();
        assert_eq!(state.cached_profile().unwrap(), None);
    }
}
