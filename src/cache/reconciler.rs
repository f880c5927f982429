use std::sync::Arc;

use tracing::{debug, info};

use super::{IndexKind, IndexStore, RecordStore};
use crate::error::Result;
use crate::models::{ListingRecord, UserContext};
use crate::storage::DurableStorage;

/// Single place where server results and local mutations meet the cache.
///
/// Record content is always written before the index that references it,
/// so a reader between the two writes never sees an unresolvable id.
pub struct Reconciler {
    records: Arc<RecordStore>,
    owned: IndexStore,
    interests: IndexStore,
}

impl Reconciler {
    pub fn new(storage: Arc<dyn DurableStorage>, records: Arc<RecordStore>) -> Self {
        Self {
            owned: IndexStore::new(IndexKind::Owned, storage.clone(), records.clone()),
            interests: IndexStore::new(IndexKind::Interest, storage, records.clone()),
            records,
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn index(&self, kind: IndexKind) -> &IndexStore {
        match kind {
            IndexKind::Owned => &self.owned,
            IndexKind::Interest => &self.interests,
        }
    }

    /// Merge an authoritative fetch: records are upserted, the index is
    /// rebuilt from exactly the fetched ids.
    pub fn reconcile(
        &self,
        kind: IndexKind,
        context: &UserContext,
        authoritative: &[ListingRecord],
    ) -> Result<Vec<ListingRecord>> {
        self.records.upsert_many(authoritative)?;
        let ids: Vec<String> = authoritative.iter().map(|r| r.listing_id.clone()).collect();
        self.index(kind).replace_all(context, &ids)?;
        info!(index = %kind, count = ids.len(), "reconciled authoritative fetch");
        self.index(kind).resolve(context)?.require_complete()
    }

    /// A listing the user just created
    pub fn on_create(&self, owner: &UserContext, record: &ListingRecord) -> Result<()> {
        self.records.upsert_many(std::slice::from_ref(record))?;
        self.owned.insert_front(owner, &record.listing_id)?;
        debug!(listing_id = %record.listing_id, "applied local create");
        Ok(())
    }

    /// An edited listing. Ownership cannot change, so indexes stay as they are.
    pub fn on_update(&self, record: &ListingRecord) -> Result<()> {
        self.records.upsert_many(std::slice::from_ref(record))?;
        debug!(listing_id = %record.listing_id, "applied local update");
        Ok(())
    }

    /// A listing whose deletion the server confirmed
    pub fn on_delete(&self, owner: &UserContext, listing_id: &str) -> Result<()> {
        self.records.remove(listing_id)?;
        self.owned.remove(owner, listing_id)?;
        debug!(listing_id, "applied local delete");
        Ok(())
    }

    /// A listing the server accepted an interest for
    pub fn on_interest(&self, tenant: &UserContext, record: &ListingRecord) -> Result<()> {
        self.records.upsert_many(std::slice::from_ref(record))?;
        self.interests.insert_front(tenant, &record.listing_id)?;
        debug!(listing_id = %record.listing_id, "applied local interest");
        Ok(())
    }
}
