use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::models::ListingRecord;
use crate::storage::{write_json, DurableStorage, LISTINGS_KEY};

/// A persisted entry that failed validation on load
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantinedEntry {
    pub position: usize,
    pub reason: String,
    pub raw: Value,
}

#[derive(Default, Clone)]
struct Records {
    /// Listing ids, most recently inserted first
    order: Vec<String>,
    by_id: HashMap<String, ListingRecord>,
}

impl Records {
    fn ordered(&self) -> Vec<&ListingRecord> {
        self.order.iter().filter_map(|id| self.by_id.get(id)).collect()
    }
}

/// Durable store of listing records keyed by listing id.
///
/// The full content is rewritten under the `listings` key after every
/// mutation; the in-memory view only changes once that write succeeded.
pub struct RecordStore {
    storage: Arc<dyn DurableStorage>,
    records: RwLock<Records>,
    quarantined: Vec<QuarantinedEntry>,
}

fn poisoned() -> CacheError {
    CacheError::Storage("record store lock poisoned".into())
}

impl RecordStore {
    /// Load the persisted records, quarantining entries that fail validation.
    pub fn open(storage: Arc<dyn DurableStorage>) -> Result<Self> {
        let mut records = Records::default();
        let mut quarantined = Vec::new();

        let raw = storage.read(LISTINGS_KEY)?;
        let entries = match raw.as_deref().map(serde_json::from_str::<Value>) {
            None => Vec::new(),
            Some(Ok(Value::Array(entries))) => entries,
            Some(Ok(other)) => {
                warn!("persisted listings are not an array; starting empty");
                quarantined.push(QuarantinedEntry {
                    position: 0,
                    reason: "expected an array of listings".to_string(),
                    raw: other,
                });
                Vec::new()
            }
            Some(Err(e)) => {
                warn!(error = %e, "persisted listings are unreadable; starting empty");
                quarantined.push(QuarantinedEntry {
                    position: 0,
                    reason: e.to_string(),
                    raw: Value::String(raw.clone().unwrap_or_default()),
                });
                Vec::new()
            }
        };

        for (position, entry) in entries.into_iter().enumerate() {
            match ListingRecord::from_value(entry.clone()) {
                // The front of the array is the newest entry, so a later
                // duplicate is stale.
                Ok(record) if records.by_id.contains_key(&record.listing_id) => {
                    debug!(listing_id = %record.listing_id, "dropping duplicate cached listing");
                }
                Ok(record) => {
                    records.order.push(record.listing_id.clone());
                    records.by_id.insert(record.listing_id.clone(), record);
                }
                Err(reason) => {
                    warn!(position, %reason, "quarantined malformed cached listing");
                    quarantined.push(QuarantinedEntry {
                        position,
                        reason,
                        raw: entry,
                    });
                }
            }
        }

        debug!(
            records = records.order.len(),
            quarantined = quarantined.len(),
            "record store loaded"
        );
        Ok(Self {
            storage,
            records: RwLock::new(records),
            quarantined,
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<ListingRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.by_id.get(id).cloned())
    }

    /// Records for `ids` in the same order, skipping ids that are absent
    pub fn get_many(&self, ids: &[String]) -> Result<Vec<ListingRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(ids
            .iter()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect())
    }

    /// Insert or fully replace each record by id.
    ///
    /// Replaced records keep their position; new ones go to the front in
    /// the order given. Applying the same batch twice is a no-op the second time.
    pub fn upsert_many(&self, batch: &[ListingRecord]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        for record in batch {
            record.validate().map_err(CacheError::InvalidRecord)?;
        }

        let mut guard = self.records.write().map_err(|_| poisoned())?;
        let mut next = guard.clone();
        let mut inserted = Vec::new();
        for record in batch {
            let id = record.listing_id.clone();
            if next.by_id.insert(id.clone(), record.clone()).is_none() {
                inserted.push(id);
            }
        }
        if !inserted.is_empty() {
            inserted.extend(next.order.drain(..));
            next.order = inserted;
        }

        self.persist(&next)?;
        *guard = next;
        debug!(count = batch.len(), "upserted listings");
        Ok(())
    }

    /// Delete a record; absent ids are ignored
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut guard = self.records.write().map_err(|_| poisoned())?;
        if !guard.by_id.contains_key(id) {
            return Ok(());
        }
        let mut next = guard.clone();
        next.by_id.remove(id);
        next.order.retain(|existing| existing != id);

        self.persist(&next)?;
        *guard = next;
        debug!(listing_id = id, "removed listing");
        Ok(())
    }

    /// All records, most recently inserted first
    pub fn all(&self) -> Result<Vec<ListingRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.ordered().into_iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries rejected when the store was loaded
    pub fn quarantined(&self) -> &[QuarantinedEntry] {
        &self.quarantined
    }

    /// Drop every record from memory and storage
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.records.write().map_err(|_| poisoned())?;
        self.storage.remove(LISTINGS_KEY)?;
        *guard = Records::default();
        Ok(())
    }

    fn persist(&self, records: &Records) -> Result<()> {
        write_json(self.storage.as_ref(), LISTINGS_KEY, &records.ordered())
    }
}
