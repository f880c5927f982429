#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use listing_cache::{
    CacheError, InMemoryStorage, ListingApi, ListingDraft, ListingRecord, ListingSession, Reconciler,
    RecordStore, Result, SearchFilters, SessionOptions, TenantId, UserContext, UserProfile,
};

pub fn listing(id: &str, rpm: f64) -> ListingRecord {
    ListingRecord {
        listing_id: id.to_string(),
        owner_id: "owner@example.com".to_string(),
        bhk: 2,
        rpm,
        state: "Karnataka".to_string(),
        district: "Bengaluru Urban".to_string(),
        area: "Koramangala".to_string(),
        date_available: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        rental_information: Default::default(),
        lease_terms: Default::default(),
        highlights: vec![],
        extra: Default::default(),
    }
}

pub fn owner() -> UserContext {
    UserContext::new("owner@example.com", "owner-token")
}

pub fn ids(records: &[ListingRecord]) -> Vec<&str> {
    records.iter().map(|r| r.listing_id.as_str()).collect()
}

/// Scripted API that records every call it receives
pub struct FakeApi {
    pub owned: Mutex<Result<Vec<ListingRecord>>>,
    pub interests: Mutex<Result<Vec<ListingRecord>>>,
    pub matches: Mutex<Result<Vec<TenantId>>>,
    pub search_results: Mutex<Vec<ListingRecord>>,
    pub profile: Mutex<Option<UserProfile>>,
    pub tenants: Mutex<Vec<UserProfile>>,
    /// Returned by every mutation when set
    pub mutation_error: Mutex<Option<CacheError>>,
    /// Simulated network latency for every call
    pub latency: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            owned: Mutex::new(Ok(vec![])),
            interests: Mutex::new(Ok(vec![])),
            matches: Mutex::new(Ok(vec![])),
            search_results: Mutex::new(vec![]),
            profile: Mutex::new(None),
            tenants: Mutex::new(vec![]),
            mutation_error: Mutex::new(None),
            latency: Mutex::new(Duration::ZERO),
            calls: Mutex::new(vec![]),
        }
    }
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_owned(&self, result: Result<Vec<ListingRecord>>) {
        *self.owned.lock().unwrap() = result;
    }

    pub fn set_interests(&self, result: Result<Vec<ListingRecord>>) {
        *self.interests.lock().unwrap() = result;
    }

    pub fn set_matches(&self, result: Result<Vec<TenantId>>) {
        *self.matches.lock().unwrap() = result;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn fail_mutations(&self, error: CacheError) {
        *self.mutation_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    async fn enter(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn mutation_result(&self) -> Result<()> {
        match self.mutation_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ListingApi for FakeApi {
    async fn owned_listings(&self, _context: &UserContext) -> Result<Vec<ListingRecord>> {
        self.enter("owned").await;
        self.owned.lock().unwrap().clone()
    }

    async fn interests(&self, _context: &UserContext) -> Result<Vec<ListingRecord>> {
        self.enter("interests").await;
        self.interests.lock().unwrap().clone()
    }

    async fn matches(&self, _context: &UserContext, _listing_id: &str) -> Result<Vec<TenantId>> {
        self.enter("matches").await;
        self.matches.lock().unwrap().clone()
    }

    async fn express_interest(&self, _context: &UserContext, _listing_id: &str) -> Result<String> {
        self.enter("express_interest").await;
        self.mutation_result()?;
        Ok("Interest recorded".to_string())
    }

    async fn create_listing(&self, context: &UserContext, draft: &ListingDraft) -> Result<ListingRecord> {
        self.enter("create").await;
        self.mutation_result()?;
        let mut created = listing(draft.listing_id.as_deref().unwrap_or("NEW-1"), draft.rpm);
        created.owner_id = context.email_id.clone();
        created.highlights = draft.highlights.clone();
        Ok(created)
    }

    async fn update_listing(&self, _context: &UserContext, draft: &ListingDraft) -> Result<ListingRecord> {
        self.enter("update").await;
        self.mutation_result()?;
        let id = draft
            .listing_id
            .clone()
            .ok_or_else(|| CacheError::FetchFailure("listingId is required".into()))?;
        Ok(listing(&id, draft.rpm))
    }

    async fn delete_listing(&self, _context: &UserContext, _listing_id: &str, _owner_id: &str) -> Result<String> {
        self.enter("delete").await;
        self.mutation_result()?;
        Ok("Listing deleted successfully".to_string())
    }

    async fn search(&self, _filters: &SearchFilters) -> Result<Vec<ListingRecord>> {
        self.enter("search").await;
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn profile(&self, _context: &UserContext) -> Result<Option<UserProfile>> {
        self.enter("profile").await;
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn update_profile(&self, _context: &UserContext, _profile: &UserProfile) -> Result<()> {
        self.enter("update_profile").await;
        self.mutation_result()
    }

    async fn tenant_profile(&self, _context: &UserContext, tenant_id: &str) -> Result<Option<UserProfile>> {
        self.enter("tenant_profile").await;
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.email_id == tenant_id)
            .cloned())
    }
}

pub fn options(request_timeout: Duration) -> SessionOptions {
    SessionOptions {
        request_timeout,
        credential_timeout: Duration::from_millis(200),
    }
}

/// Session over in-memory storage, signed in as [`owner`]
pub fn signed_in_session(storage: &InMemoryStorage, api: &Arc<FakeApi>) -> ListingSession {
    let session = ListingSession::open(
        Arc::new(storage.clone()),
        api.clone(),
        options(Duration::from_secs(2)),
    )
    .unwrap();
    session.credentials().sign_in(owner());
    session
}

/// Stand-alone stores sharing `storage`, for arranging cache state
pub fn stores(storage: &InMemoryStorage) -> Reconciler {
    let shared: Arc<dyn listing_cache::DurableStorage> = Arc::new(storage.clone());
    let records = Arc::new(RecordStore::open(shared.clone()).unwrap());
    Reconciler::new(shared, records)
}
