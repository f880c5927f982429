pub mod index_store;
pub mod match_cache;
pub mod reconciler;
pub mod record_store;

pub use index_store::{IndexKind, IndexResolution, IndexStore};
pub use match_cache::MatchCache;
pub use reconciler::Reconciler;
pub use record_store::{QuarantinedEntry, RecordStore};
