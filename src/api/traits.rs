use crate::api::types::SearchFilters;
use crate::error::Result;
use crate::models::{ListingDraft, ListingRecord, TenantId, UserContext, UserProfile};
use async_trait::async_trait;

/// Remote listing API consumed by the cache.
/// Implemented over HTTP in production and by fakes in tests.
#[async_trait]
pub trait ListingApi: Send + Sync {
    /// Authoritative set of listings owned by the user
    async fn owned_listings(&self, context: &UserContext) -> Result<Vec<ListingRecord>>;

    /// Authoritative set of listings the user expressed interest in
    async fn interests(&self, context: &UserContext) -> Result<Vec<ListingRecord>>;

    /// Tenants matched to one of the user's listings
    async fn matches(&self, context: &UserContext, listing_id: &str) -> Result<Vec<TenantId>>;

    /// Record the user's interest in a listing; returns the server message
    async fn express_interest(&self, context: &UserContext, listing_id: &str) -> Result<String>;

    async fn create_listing(&self, context: &UserContext, draft: &ListingDraft) -> Result<ListingRecord>;

    async fn update_listing(&self, context: &UserContext, draft: &ListingDraft) -> Result<ListingRecord>;

    /// Returns the server confirmation message
    async fn delete_listing(&self, context: &UserContext, listing_id: &str, owner_id: &str) -> Result<String>;

    /// Live search; results are never cached
    async fn search(&self, filters: &SearchFilters) -> Result<Vec<ListingRecord>>;

    async fn profile(&self, context: &UserContext) -> Result<Option<UserProfile>>;

    async fn update_profile(&self, context: &UserContext, profile: &UserProfile) -> Result<()>;

    /// Profile of a tenant matched to one of the user's listings
    async fn tenant_profile(&self, context: &UserContext, tenant_id: &str) -> Result<Option<UserProfile>>;
}
