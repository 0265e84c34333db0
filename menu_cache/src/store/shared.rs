//! Shared cache backend
//!
//! Multiple bot instances share one durable Redis record holding the
//! whole map as a JSON document. Each instance keeps an in-memory mirror
//! refreshed from Redis at most once per debounce window to bound read
//! amplification; every write pushes the full mirror back.

use super::{CacheEntry, CacheStore};
use crate::errors::CacheError;
use async_trait::async_trait;
use config::CacheConfig;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

struct Mirror {
    entries: HashMap<String, CacheEntry>,
    refreshed_at: Option<Instant>,
}

/// Redis-backed cache store shared between instances.
pub struct SharedCacheStore {
    client: Arc<Client>,
    connection: RwLock<Option<redis::aio::MultiplexedConnection>>,
    record_key: String,
    debounce: Duration,
    max_record_bytes: usize,
    mirror: Mutex<Mirror>,
}

impl SharedCacheStore {
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            connection: RwLock::new(None),
            record_key: config.record_key.clone(),
            debounce: Duration::from_secs(config.refresh_debounce_seconds),
            max_record_bytes: config.max_record_bytes,
            mirror: Mutex::new(Mirror {
                entries: HashMap::new(),
                refreshed_at: None,
            }),
        })
    }

    /// Get or create the Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        let mut connection = self.connection.write().await;

        if connection.is_none() {
            *connection = Some(self.client.get_multiplexed_async_connection().await?);
        }

        // Safe extraction: we just ensured a connection exists above
        Ok(connection
            .as_ref()
            .ok_or_else(|| CacheError::Connection("no Redis connection available".into()))?
            .clone())
    }

    /// Pull the durable record into the mirror. Oversized or unparseable
    /// records bound a design defect upstream; the store self-heals by
    /// clearing them.
    async fn refresh_mirror(&self, mirror: &mut Mirror) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.get(&self.record_key).await?;

        let entries = match raw {
            None => HashMap::new(),
            Some(raw) if raw.len() > self.max_record_bytes => {
                warn!(
                    key = %self.record_key,
                    bytes = raw.len(),
                    "shared cache record oversized, clearing it"
                );
                let _: () = conn.del(&self.record_key).await?;
                HashMap::new()
            }
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(key = %self.record_key, error = %e, "shared cache record unreadable, clearing it");
                    let _: () = conn.del(&self.record_key).await?;
                    HashMap::new()
                }
            },
        };

        mirror.entries = entries;
        mirror.refreshed_at = Some(Instant::now());
        Ok(())
    }
}

#[async_trait]
impl CacheStore for SharedCacheStore {
    async fn snapshot(&self) -> HashMap<String, CacheEntry> {
        let mut mirror = self.mirror.lock().await;

        let stale = match mirror.refreshed_at {
            None => true,
            Some(at) => at.elapsed() >= self.debounce,
        };
        if stale {
            if let Err(e) = self.refresh_mirror(&mut mirror).await {
                warn!(error = %e, "failed to refresh cache mirror from Redis, serving last known state");
            }
        }

        mirror.entries.clone()
    }

    async fn replace(&self, entries: HashMap<String, CacheEntry>) {
        let mut mirror = self.mirror.lock().await;
        mirror.entries = entries;
        mirror.refreshed_at = Some(Instant::now());

        let raw = match serde_json::to_string(&mirror.entries) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to serialize shared cache record");
                return;
            }
        };

        let result: Result<(), CacheError> = async {
            let mut conn = self.get_connection().await?;
            let _: () = conn.set(&self.record_key, raw).await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "failed to push cache record to Redis, keeping in-memory state");
        }
    }
}
