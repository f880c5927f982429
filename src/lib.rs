//! Client-side listing cache: durable listing records, per-user indexes of
//! owned and interesting listings, session match sets, and the coordinator
//! that decides when to call the remote API.

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod session;
pub mod storage;

pub use api::{HttpListingApi, ListingApi, SearchFilters};
pub use cache::{IndexKind, IndexResolution, IndexStore, MatchCache, Reconciler, RecordStore};
pub use config::AppConfig;
pub use coordinator::{FetchCoordinator, Loaded, Resource};
pub use error::{CacheError, Result};
pub use models::{LeaseTerms, ListingDraft, ListingRecord, RentalInformation, TenantId, UserContext, UserProfile};
pub use session::{ListingSession, SessionCredentials, SessionOptions};
pub use storage::{DurableStorage, FileStorage, InMemoryStorage};
