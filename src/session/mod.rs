pub mod credentials;
pub mod handoff;

pub use credentials::SessionCredentials;
pub use handoff::LocalState;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::api::{ListingApi, SearchFilters};
use crate::cache::{IndexKind, MatchCache, Reconciler, RecordStore};
use crate::coordinator::{with_timeout, FetchCoordinator, Loaded, Resource};
use crate::error::Result;
use crate::models::{ListingDraft, ListingRecord, TenantId, UserContext, UserProfile};
use crate::storage::DurableStorage;

/// Timeouts applied by a session
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub request_timeout: Duration,
    pub credential_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(40),
            credential_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything one browsing session needs, constructed once and shared by
/// every view: stores, reconciler, coordinator and the credential.
///
/// Mutations go to the API first; the local cache is touched only after
/// the server confirmed, so a failed call leaves it exactly as it was.
pub struct ListingSession {
    storage: Arc<dyn DurableStorage>,
    credentials: SessionCredentials,
    reconciler: Arc<Reconciler>,
    matches: Arc<MatchCache>,
    coordinator: FetchCoordinator,
    local: LocalState,
    options: SessionOptions,
}

impl ListingSession {
    pub fn open(
        storage: Arc<dyn DurableStorage>,
        api: Arc<dyn ListingApi>,
        options: SessionOptions,
    ) -> Result<Self> {
        let records = Arc::new(RecordStore::open(Arc::clone(&storage))?);
        if !records.quarantined().is_empty() {
            warn!(count = records.quarantined().len(), "cached listings were quarantined");
        }
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&storage), records));
        let matches = Arc::new(MatchCache::new());
        let coordinator = FetchCoordinator::new(
            api,
            Arc::clone(&reconciler),
            Arc::clone(&matches),
            options.request_timeout,
        );

        Ok(Self {
            local: LocalState::new(Arc::clone(&storage)),
            storage,
            credentials: SessionCredentials::new(),
            reconciler,
            matches,
            coordinator,
            options,
        })
    }

    pub fn credentials(&self) -> &SessionCredentials {
        &self.credentials
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn match_cache(&self) -> &MatchCache {
        &self.matches
    }

    async fn context(&self) -> Result<UserContext> {
        self.credentials
            .wait_for_credential(self.options.credential_timeout)
            .await
    }

    fn api(&self) -> &Arc<dyn ListingApi> {
        self.coordinator.api()
    }

    pub async fn owned_listings(&self) -> Result<Vec<ListingRecord>> {
        let context = self.context().await?;
        self.coordinator.load_listings(IndexKind::Owned, &context).await
    }

    pub async fn interests(&self) -> Result<Vec<ListingRecord>> {
        let context = self.context().await?;
        self.coordinator.load_listings(IndexKind::Interest, &context).await
    }

    pub async fn matches_for(&self, listing_id: &str) -> Result<Vec<TenantId>> {
        let context = self.context().await?;
        self.coordinator.load_matches(listing_id, &context).await
    }

    pub async fn refresh(&self, resource: &Resource) -> Result<Loaded> {
        let context = self.context().await?;
        self.coordinator.refresh(resource, &context).await
    }

    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<ListingRecord>> {
        self.coordinator.search(filters).await
    }

    pub async fn create_listing(&self, draft: &ListingDraft) -> Result<ListingRecord> {
        let context = self.context().await?;
        let created = with_timeout(
            self.options.request_timeout,
            self.api().create_listing(&context, draft),
        )
        .await?;
        self.reconciler.on_create(&context, &created)?;
        info!(listing_id = %created.listing_id, "listing created");
        Ok(created)
    }

    pub async fn update_listing(&self, draft: &ListingDraft) -> Result<ListingRecord> {
        let context = self.context().await?;
        let updated = with_timeout(
            self.options.request_timeout,
            self.api().update_listing(&context, draft),
        )
        .await?;
        self.reconciler.on_update(&updated)?;
        info!(listing_id = %updated.listing_id, "listing updated");
        Ok(updated)
    }

    /// Delete on the server, then locally. Returns the server message.
    pub async fn delete_listing(&self, listing_id: &str, owner_id: &str) -> Result<String> {
        let context = self.context().await?;
        let message = with_timeout(
            self.options.request_timeout,
            self.api().delete_listing(&context, listing_id, owner_id),
        )
        .await?;
        self.reconciler.on_delete(&context, listing_id)?;
        info!(listing_id, "listing deleted");
        Ok(message)
    }

    /// Tell the owner the user is interested. Returns the server message.
    pub async fn express_interest(&self, record: &ListingRecord) -> Result<String> {
        let context = self.context().await?;
        let message = with_timeout(
            self.options.request_timeout,
            self.api().express_interest(&context, &record.listing_id),
        )
        .await?;
        self.reconciler.on_interest(&context, record)?;
        Ok(message)
    }

    /// Hand a listing to a detail view
    pub fn select_listing(&self, record: &ListingRecord) -> Result<()> {
        self.local.select_listing(record)
    }

    pub fn selected_listing(&self) -> Result<Option<ListingRecord>> {
        self.local.selected_listing()
    }

    /// Detail lookup: the handed-off listing if it matches, else the record store
    pub fn find_listing(&self, listing_id: &str) -> Result<Option<ListingRecord>> {
        if let Some(selected) = self.local.selected_listing()? {
            if selected.listing_id == listing_id {
                return Ok(Some(selected));
            }
        }
        self.reconciler.records().get(listing_id)
    }

    /// Cached profile when present, otherwise fetched and cached
    pub async fn load_profile(&self) -> Result<Option<UserProfile>> {
        if let Some(profile) = self.local.cached_profile()? {
            return Ok(Some(profile));
        }
        let context = self.context().await?;
        let fetched = with_timeout(self.options.request_timeout, self.api().profile(&context)).await?;
        if let Some(profile) = &fetched {
            self.local.store_profile(profile)?;
        }
        Ok(fetched)
    }

    pub async fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let context = self.context().await?;
        with_timeout(
            self.options.request_timeout,
            self.api().update_profile(&context, profile),
        )
        .await?;
        self.local.store_profile(profile)
    }

    /// Details of a matched tenant; always fetched live
    pub async fn tenant_profile(&self, tenant_id: &str) -> Result<Option<UserProfile>> {
        let context = self.context().await?;
        with_timeout(
            self.options.request_timeout,
            self.api().tenant_profile(&context, tenant_id),
        )
        .await
    }

    /// Logout: wipe every persisted key, the match cache and the credential
    pub fn clear_session(&self) -> Result<()> {
        self.reconciler.records().clear()?;
        for key in self.storage.keys()? {
            self.storage.remove(&key)?;
        }
        self.matches.clear();
        self.credentials.sign_out();
        info!("session cleared");
        Ok(())
    }
}
