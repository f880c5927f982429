pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::InMemoryStorage;

use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage key of the global record store
pub const LISTINGS_KEY: &str = "listings";
/// Prefix of the per-user owned listing index
pub const MY_LISTINGS_KEY: &str = "myListings";
/// Prefix of the per-user interest index
pub const MY_INTERESTS_KEY: &str = "myInterests";
/// Listing handed from a list view to a detail view
pub const SELECTED_LISTING_KEY: &str = "selectedListing";
/// Cached profile of the signed-in user
pub const USER_INFO_KEY: &str = "userInfo";

/// Durable string-valued key/value storage.
///
/// Every `write` replaces the whole value for a key in one step; callers
/// never patch a value incrementally.
pub trait DurableStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;
}

/// Serialize `value` and store it under `key`
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn DurableStorage,
    key: &str,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_string(value)
        .map_err(|e| CacheError::Storage(format!("failed to encode {}: {}", key, e)))?;
    storage.write(key, &encoded)
}

/// Read and decode the value stored under `key`.
///
/// A value that no longer decodes is reported as a storage error so the
/// caller can decide whether to discard it.
pub fn read_json<T: DeserializeOwned>(storage: &dyn DurableStorage, key: &str) -> Result<Option<T>> {
    match storage.read(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::Storage(format!("failed to decode {}: {}", key, e))),
        None => Ok(None),
    }
}
