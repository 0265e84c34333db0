//! TTL-keyed cache over paginated remote fetches
//!
//! [`MenuCache`] answers reads from a persisted entry map when the entry
//! is still within its TTL and otherwise drives the injected fetch
//! function through the provider's pagination until exhausted, merging
//! all pages into one logical collection.

use crate::errors::FetchError;
use crate::store::{CacheEntry, CacheStore};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One page of a paginated provider response, mirroring the upstream
/// `X-Current-Page` / `X-Total-Pages` counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub current_page: u32,
    pub total_pages: u32,
}

impl Page {
    /// A response that was not paginated by the provider.
    pub fn single(items: Vec<Value>) -> Self {
        Self {
            items,
            current_page: 1,
            total_pages: 1,
        }
    }
}

/// Cache of remote menu data with per-call TTL and lazy expiry.
pub struct MenuCache {
    store: Arc<dyn CacheStore>,
}

impl MenuCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Return the cached collection for `key` if a valid entry exists;
    /// otherwise fetch every page, persist the merged result stamped with
    /// the current time, and return it.
    ///
    /// Fetch errors propagate unmodified and are never retried here.
    /// A failing persistence write is logged by the backend and does not
    /// fail the call; the fresh value stays authoritative in memory.
    pub async fn fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch_fn: F,
    ) -> Result<Vec<Value>, FetchError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Page, FetchError>>,
    {
        self.fetch_at(Utc::now(), key, ttl, fetch_fn).await
    }

    pub(crate) async fn fetch_at<F, Fut>(
        &self,
        now: DateTime<Utc>,
        key: &str,
        ttl: Duration,
        fetch_fn: F,
    ) -> Result<Vec<Value>, FetchError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Page, FetchError>>,
    {
        let mut entries = self.store.snapshot().await;

        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(now, ttl) {
                return Ok(entry.payload.clone());
            }
            // Expired entries are evicted lazily, on the lookup that
            // observes the expiry
            entries.remove(key);
        }

        let payload = Self::fetch_all_pages(&fetch_fn).await?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                fetched_at: now,
                payload: payload.clone(),
            },
        );
        self.store.replace(entries).await;

        Ok(payload)
    }

    /// Answer whether a valid entry exists for `key` without ever
    /// invoking a fetch. Callers use this to offer only already-cached
    /// answers instead of hammering the upstream provider on demand.
    pub async fn is_fresh(&self, key: &str, ttl: Duration) -> bool {
        self.is_fresh_at(Utc::now(), key, ttl).await
    }

    pub(crate) async fn is_fresh_at(&self, now: DateTime<Utc>, key: &str, ttl: Duration) -> bool {
        self.store
            .snapshot()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_fresh(now, ttl))
    }

    /// Drop every entry (manual cache-busting).
    pub async fn invalidate_all(&self) {
        self.store.replace(HashMap::new()).await;
    }

    /// Follow the provider's pagination counters from page 1 until
    /// exhausted and concatenate all items in page order.
    async fn fetch_all_pages<F, Fut>(fetch_fn: &F) -> Result<Vec<Value>, FetchError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Page, FetchError>>,
    {
        let first = fetch_fn(1).await?;
        let mut items = first.items;
        let mut current = first.current_page;
        let mut total = first.total_pages;

        while current < total {
            let page = fetch_fn(current + 1).await?;
            if page.current_page <= current {
                return Err(FetchError::MalformedPage(format!(
                    "pagination did not advance past page {}",
                    current
                )));
            }
            items.extend(page.items);
            current = page.current_page;
            total = page.total_pages;
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileCacheStore;
    use chrono::TimeDelta;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn file_cache(dir: &tempfile::TempDir) -> MenuCache {
        MenuCache::new(Arc::new(FileCacheStore::open(
            dir.path().join("mensacache.json"),
        )))
    }

    fn meals(n: u64) -> Vec<Value> {
        (0..n).map(|i| json!({"id": i, "name": "meal"})).collect()
    }

    #[tokio::test]
    async fn test_fetch_caches_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_secs(3600);

        let fetch = |_page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Page::single(meals(3))) }
        };

        let t0 = Utc::now();
        let first = cache.fetch_at(t0, "days", ttl, fetch).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Just inside the TTL: identical payload, no second fetch
        let just_inside = t0 + TimeDelta::seconds(3599);
        let second = cache.fetch_at(just_inside, "days", ttl, fetch).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_refetches_exactly_once_after_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_secs(3600);

        let fetch = |_page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Page::single(meals(1))) }
        };

        let t0 = Utc::now();
        cache.fetch_at(t0, "days", ttl, fetch).await.unwrap();

        let just_past = t0 + TimeDelta::seconds(3601);
        cache.fetch_at(just_past, "days", ttl, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pagination_merges_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);

        let fetch = |page: u32| async move {
            let items: Vec<Value> = (0..4).map(|i| json!(format!("p{}-{}", page, i))).collect();
            Ok(Page {
                items,
                current_page: page,
                total_pages: 3,
            })
        };

        let merged = cache
            .fetch("canteens", Duration::from_secs(60), fetch)
            .await
            .unwrap();

        assert_eq!(merged.len(), 12);
        assert_eq!(merged[0], json!("p1-0"));
        assert_eq!(merged[4], json!("p2-0"));
        assert_eq!(merged[11], json!("p3-3"));
    }

    #[tokio::test]
    async fn test_non_advancing_pagination_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);

        let fetch = |_page: u32| async move {
            Ok(Page {
                items: vec![json!(1)],
                current_page: 1,
                total_pages: 2,
            })
        };

        let result = cache.fetch("canteens", Duration::from_secs(60), fetch).await;
        assert!(matches!(result, Err(FetchError::MalformedPage(_))));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);
        let calls = AtomicU32::new(0);

        let fetch = |_page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(FetchError::Unreachable("connection refused".into())) }
        };

        let result = cache.fetch("days", Duration::from_secs(60), fetch).await;
        assert!(matches!(result, Err(FetchError::Unreachable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Nothing was cached for the failed key
        assert!(!cache.is_fresh("days", Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_is_fresh_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);
        let ttl = Duration::from_secs(3600);

        assert!(!cache.is_fresh("days", ttl).await);

        let t0 = Utc::now();
        cache
            .fetch_at(t0, "days", ttl, |_| async { Ok(Page::single(meals(2))) })
            .await
            .unwrap();

        assert!(cache.is_fresh_at(t0 + TimeDelta::seconds(10), "days", ttl).await);
        assert!(
            !cache
                .is_fresh_at(t0 + TimeDelta::seconds(3601), "days", ttl)
                .await
        );
    }

    #[tokio::test]
    async fn test_fetch_survives_failing_durable_write() {
        let dir = tempfile::tempdir().unwrap();
        // A directory as the snapshot path makes every disk write fail
        let cache = MenuCache::new(Arc::new(FileCacheStore::open(dir.path())));
        let calls = AtomicU32::new(0);
        let ttl = Duration::from_secs(3600);

        let fetch = |_page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Page::single(meals(3))) }
        };

        let t0 = Utc::now();
        let payload = cache.fetch_at(t0, "days", ttl, fetch).await.unwrap();
        assert_eq!(payload.len(), 3);

        // The in-memory entry stays authoritative despite the failed write
        let later = t0 + TimeDelta::seconds(10);
        let again = cache.fetch_at(later, "days", ttl, fetch).await.unwrap();
        assert_eq!(again, payload);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_drops_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = file_cache(&dir);
        let ttl = Duration::from_secs(3600);

        cache
            .fetch("a", ttl, |_| async { Ok(Page::single(meals(1))) })
            .await
            .unwrap();
        cache
            .fetch("b", ttl, |_| async { Ok(Page::single(meals(1))) })
            .await
            .unwrap();

        cache.invalidate_all().await;

        assert!(!cache.is_fresh("a", ttl).await);
        assert!(!cache.is_fresh("b", ttl).await);
    }

    #[tokio::test]
    async fn test_cached_payload_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = Duration::from_secs(3600);

        {
            let cache = file_cache(&dir);
            cache
                .fetch("days", ttl, |_| async { Ok(Page::single(meals(5))) })
                .await
                .unwrap();
        }

        let cache = file_cache(&dir);
        let payload = cache
            .fetch("days", ttl, |_| async {
                Err(FetchError::Unreachable("must not be called".into()))
            })
            .await
            .unwrap();
        assert_eq!(payload.len(), 5);
    }
}
