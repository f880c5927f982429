//! Error types for the listing cache

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Everything that can go wrong between a caller and the cached listings.
///
/// Cloneable so a single in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// An index references listings the record store does not hold.
    /// Internal signal that triggers a refetch; never shown to users.
    #[error("cache miss: {} listing(s) unresolved", missing.len())]
    CacheMiss { missing: Vec<String> },

    /// Network, server or timeout failure. Local state is left as it was.
    #[error("fetch failed: {0}")]
    FetchFailure(String),

    /// The server rejected the session token (HTTP 401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with a payload that could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A record failed validation before it could be cached
    #[error("invalid listing: {0}")]
    InvalidRecord(String),

    /// Durable storage could not be read or written
    #[error("storage error: {0}")]
    Storage(String),

    /// No credential became available in time
    #[error("credential unavailable: {0}")]
    Credential(String),
}

impl CacheError {
    /// Malformed payloads count as failed fetches, never as partial success.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            CacheError::FetchFailure(_) | CacheError::MalformedResponse(_)
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CacheError::Unauthorized(_))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CacheError::MalformedResponse(err.to_string())
        } else {
            CacheError::FetchFailure(err.to_string())
        }
    }
}
