//! Convenience re-exports for common menu-cache usage

pub use crate::cache::{MenuCache, Page};
pub use crate::errors::{CacheError, FetchError};
pub use crate::key::cache_key;
pub use crate::store::{CacheEntry, CacheStore, FileCacheStore, SharedCacheStore};
