//! Cache for remote menu data
//!
//! This crate provides a TTL-keyed cache over paginated JSON resource
//! fetches from the upstream menu provider, with a pluggable persistence
//! backend (exclusive file or shared Redis record).

pub mod cache;
pub mod errors;
pub mod key;
pub mod prelude;
pub mod store;

pub use cache::{MenuCache, Page};
pub use errors::{CacheError, FetchError};
pub use key::cache_key;
pub use store::{CacheEntry, CacheStore, FileCacheStore, SharedCacheStore};
