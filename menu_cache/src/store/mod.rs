//! Persistence backends for the menu cache
//!
//! A [`CacheStore`] is an ownership boundary around the whole key → entry
//! map. Both backends keep an in-memory mirror that stays authoritative
//! for this process; durable-storage failures are logged and absorbed so
//! a storage hiccup never fails a logical cache operation.

mod file;
mod shared;

pub use file::FileCacheStore;
pub use shared::SharedCacheStore;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A single cached resource: the merged page collection and when it was
/// fetched. Entries are replaced on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub payload: Vec<serde_json::Value>,
}

impl CacheEntry {
    /// An entry is valid iff less than `ttl` has elapsed since it was fetched.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Persistence boundary around the key → entry map.
///
/// `replace` is last-writer-wins over the whole map: two concurrent
/// miss resolutions on different keys can race and one entry may be
/// lost, costing at most an extra re-fetch on the next lookup. This is
/// an accepted consistency bound of the full-map snapshot design, not
/// a correctness issue.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Current view of the whole map. Shared backends may serve a mirror
    /// that is at most one debounce window stale.
    async fn snapshot(&self) -> HashMap<String, CacheEntry>;

    /// Replace the whole map, in memory and durably.
    async fn replace(&self, entries: HashMap<String, CacheEntry>);
}
