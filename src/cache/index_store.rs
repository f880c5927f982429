use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::RecordStore;
use crate::error::{CacheError, Result};
use crate::models::{ListingRecord, UserContext};
use crate::storage::{write_json, DurableStorage, MY_INTERESTS_KEY, MY_LISTINGS_KEY};

/// Which relation an index tracks for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Owned,
    Interest,
}

impl IndexKind {
    fn key_prefix(self) -> &'static str {
        match self {
            IndexKind::Owned => MY_LISTINGS_KEY,
            IndexKind::Interest => MY_INTERESTS_KEY,
        }
    }

    /// Storage key of this index for a user
    pub fn storage_key(self, context: &UserContext) -> String {
        format!("{}:{}", self.key_prefix(), context.email_id)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Owned => write!(f, "owned listings"),
            IndexKind::Interest => write!(f, "interests"),
        }
    }
}

/// Outcome of resolving an index against the record store
#[derive(Debug, Clone, PartialEq)]
pub struct IndexResolution {
    /// Resolved records in index order
    pub records: Vec<ListingRecord>,
    /// Every id in the index resolved
    pub complete: bool,
    /// An id sequence has been persisted for this user, possibly empty
    pub fetched: bool,
    /// Ids present in the index but absent from the record store
    pub missing: Vec<String>,
}

impl IndexResolution {
    fn unfetched() -> Self {
        Self {
            records: Vec::new(),
            complete: true,
            fetched: false,
            missing: Vec::new(),
        }
    }

    /// Can be served without calling the API.
    ///
    /// A fetched, genuinely empty index is a hit; an index that was never
    /// fetched is not, even though it trivially resolves.
    pub fn is_cache_hit(&self) -> bool {
        self.fetched && self.complete
    }

    /// The records, or `CacheMiss` listing the unresolved ids
    pub fn require_complete(self) -> Result<Vec<ListingRecord>> {
        if self.complete {
            Ok(self.records)
        } else {
            Err(CacheError::CacheMiss {
                missing: self.missing,
            })
        }
    }
}

/// Ordered, per-user set of listing ids referencing the record store.
///
/// Only ids are persisted; record content lives in [`RecordStore`].
pub struct IndexStore {
    kind: IndexKind,
    storage: Arc<dyn DurableStorage>,
    records: Arc<RecordStore>,
}

impl IndexStore {
    pub fn new(kind: IndexKind, storage: Arc<dyn DurableStorage>, records: Arc<RecordStore>) -> Self {
        Self {
            kind,
            storage,
            records,
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Persisted ids for the user; `None` when never fetched.
    ///
    /// An undecodable sequence is treated as never fetched so the next load
    /// rebuilds it from the server.
    pub fn ids(&self, context: &UserContext) -> Result<Option<Vec<String>>> {
        let key = self.kind.storage_key(context);
        let Some(raw) = self.storage.read(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Ok(Some(ids)),
            Err(e) => {
                warn!(%key, error = %e, "discarding unreadable index");
                Ok(None)
            }
        }
    }

    pub fn resolve(&self, context: &UserContext) -> Result<IndexResolution> {
        let ids = match self.ids(context)? {
            Some(ids) => ids,
            None => return Ok(IndexResolution::unfetched()),
        };

        let records = self.records.get_many(&ids)?;
        let missing: Vec<String> = if records.len() == ids.len() {
            Vec::new()
        } else {
            let resolved: HashSet<&str> = records.iter().map(|r| r.listing_id.as_str()).collect();
            ids.iter()
                .filter(|id| !resolved.contains(id.as_str()))
                .cloned()
                .collect()
        };
        if !missing.is_empty() {
            debug!(index = %self.kind, missing = missing.len(), "index has unresolved ids");
        }

        Ok(IndexResolution {
            complete: missing.is_empty(),
            records,
            fetched: true,
            missing,
        })
    }

    /// Overwrite the whole sequence; duplicates keep their first position
    pub fn replace_all(&self, context: &UserContext, ids: &[String]) -> Result<()> {
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        self.write(context, &unique)
    }

    /// Put `id` first, moving it if already present.
    ///
    /// A never-fetched index stays absent: a one-element sequence would read
    /// as a complete fetch and hide the rest of the server's set.
    pub fn insert_front(&self, context: &UserContext, id: &str) -> Result<()> {
        let Some(mut ids) = self.ids(context)? else {
            debug!(index = %self.kind, id, "index never fetched; leaving it for the next load");
            return Ok(());
        };
        ids.retain(|existing| existing != id);
        ids.insert(0, id.to_string());
        self.write(context, &ids)
    }

    pub fn remove(&self, context: &UserContext, id: &str) -> Result<()> {
        let Some(mut ids) = self.ids(context)? else {
            return Ok(());
        };
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() == before {
            return Ok(());
        }
        self.write(context, &ids)
    }

    /// Forget the sequence so the next load goes to the server
    pub fn invalidate(&self, context: &UserContext) -> Result<()> {
        self.storage.remove(&self.kind.storage_key(context))
    }

    fn write(&self, context: &UserContext, ids: &[String]) -> Result<()> {
        write_json(self.storage.as_ref(), &self.kind.storage_key(context), ids)
    }
}
