//! Cache-or-fetch decisions for the named listing resources.
//!
//! Callers ask for a resource; a satisfying cache hit costs no network call,
//! anything else becomes exactly one in-flight request per
//! `(resource, user)` whose result is reconciled into the cache and shared
//! with every concurrent caller.

pub mod single_flight;

pub use single_flight::SingleFlight;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::api::{ListingApi, SearchFilters};
use crate::cache::{IndexKind, MatchCache, Reconciler};
use crate::error::{CacheError, Result};
use crate::models::{ListingRecord, TenantId, UserContext};

/// Resources the coordinator can load
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    OwnedListings,
    Interests,
    MatchesFor(String),
}

/// What a load produced
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Listings(Vec<ListingRecord>),
    Matches(Vec<TenantId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ListingKey {
    kind: IndexKind,
    email_id: String,
}

/// Match flights are also keyed by cache generation, so a load issued after
/// a refresh never joins a request that started before it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    listing_id: String,
    email_id: String,
    generation: u64,
}

/// Bound a remote call so a hung request cannot stay in flight forever
pub async fn with_timeout<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(CacheError::FetchFailure(format!(
            "request timed out after {}s",
            limit.as_secs_f32()
        ))),
    }
}

pub struct FetchCoordinator {
    api: Arc<dyn ListingApi>,
    reconciler: Arc<Reconciler>,
    matches: Arc<MatchCache>,
    request_timeout: Duration,
    listing_flights: SingleFlight<ListingKey, Vec<ListingRecord>>,
    match_flights: SingleFlight<MatchKey, Vec<TenantId>>,
}

impl FetchCoordinator {
    pub fn new(
        api: Arc<dyn ListingApi>,
        reconciler: Arc<Reconciler>,
        matches: Arc<MatchCache>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            api,
            reconciler,
            matches,
            request_timeout,
            listing_flights: SingleFlight::new(),
            match_flights: SingleFlight::new(),
        }
    }

    pub async fn load(&self, resource: &Resource, context: &UserContext) -> Result<Loaded> {
        match resource {
            Resource::OwnedListings => self
                .load_listings(IndexKind::Owned, context)
                .await
                .map(Loaded::Listings),
            Resource::Interests => self
                .load_listings(IndexKind::Interest, context)
                .await
                .map(Loaded::Listings),
            Resource::MatchesFor(listing_id) => self
                .load_matches(listing_id, context)
                .await
                .map(Loaded::Matches),
        }
    }

    /// Owned or interested listings, from cache when the index fully resolves
    pub async fn load_listings(&self, kind: IndexKind, context: &UserContext) -> Result<Vec<ListingRecord>> {
        let resolution = self.reconciler.index(kind).resolve(context)?;
        if resolution.is_cache_hit() {
            debug!(index = %kind, count = resolution.records.len(), "served from cache");
            return Ok(resolution.records);
        }
        if !resolution.missing.is_empty() {
            let miss = CacheError::CacheMiss {
                missing: resolution.missing,
            };
            debug!(index = %kind, error = %miss, "refetching");
        }
        self.fetch_listings(kind, context).await
    }

    /// Authoritative fetch merged through the reconciler. Shares the flight
    /// with any load already running for the same index and user.
    async fn fetch_listings(&self, kind: IndexKind, context: &UserContext) -> Result<Vec<ListingRecord>> {
        let key = ListingKey {
            kind,
            email_id: context.email_id.clone(),
        };
        let api = Arc::clone(&self.api);
        let reconciler = Arc::clone(&self.reconciler);
        let context = context.clone();
        let limit = self.request_timeout;

        self.listing_flights
            .run(key, move || async move {
                let fetched = with_timeout(limit, async {
                    match kind {
                        IndexKind::Owned => api.owned_listings(&context).await,
                        IndexKind::Interest => api.interests(&context).await,
                    }
                })
                .await?;
                info!(index = %kind, count = fetched.len(), "fetched authoritative listings");
                reconciler.reconcile(kind, &context, &fetched)
            })
            .await
    }

    /// Tenants matched to a listing; an empty cached list is a valid hit
    pub async fn load_matches(&self, listing_id: &str, context: &UserContext) -> Result<Vec<TenantId>> {
        if let Some(tenants) = self.matches.get(listing_id) {
            debug!(listing_id, count = tenants.len(), "matches served from cache");
            return Ok(tenants);
        }

        let generation = self.matches.generation();
        let key = MatchKey {
            listing_id: listing_id.to_string(),
            email_id: context.email_id.clone(),
            generation,
        };
        let api = Arc::clone(&self.api);
        let matches = Arc::clone(&self.matches);
        let context = context.clone();
        let listing_id = listing_id.to_string();
        let limit = self.request_timeout;

        self.match_flights
            .run(key, move || async move {
                let tenants = with_timeout(limit, api.matches(&context, &listing_id)).await?;
                if !matches.set_if_current(generation, &listing_id, tenants.clone()) {
                    debug!(%listing_id, "match cache was cleared while fetching");
                }
                Ok(tenants)
            })
            .await
    }

    /// Explicit refresh: bypass the cache and fetch again.
    ///
    /// Indexes are only replaced by a successful fetch, so a failed refresh
    /// leaves the cached listings servable. Matches are cleared up front.
    pub async fn refresh(&self, resource: &Resource, context: &UserContext) -> Result<Loaded> {
        info!(?resource, "refresh requested");
        match resource {
            Resource::OwnedListings => self
                .fetch_listings(IndexKind::Owned, context)
                .await
                .map(Loaded::Listings),
            Resource::Interests => self
                .fetch_listings(IndexKind::Interest, context)
                .await
                .map(Loaded::Listings),
            Resource::MatchesFor(listing_id) => {
                self.matches.clear();
                self.load_matches(listing_id, context).await.map(Loaded::Matches)
            }
        }
    }

    /// Live search; never cached
    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<ListingRecord>> {
        let results = with_timeout(self.request_timeout, self.api.search(filters)).await?;
        info!(count = results.len(), "search returned listings");
        Ok(results)
    }

    pub fn api(&self) -> &Arc<dyn ListingApi> {
        &self.api
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
