pub mod http;
pub mod traits;
pub mod types;

pub use http::HttpListingApi;
pub use traits::ListingApi;
pub use types::SearchFilters;
