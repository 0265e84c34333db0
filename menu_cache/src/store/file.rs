//! Exclusive-file cache backend
//!
//! The process exclusively owns a single JSON snapshot of the whole map;
//! every write re-serializes the entire map to disk.

use super::{CacheEntry, CacheStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

/// File-backed cache store for single-instance deployments.
pub struct FileCacheStore {
    path: PathBuf,
    mirror: Mutex<HashMap<String, CacheEntry>>,
}

impl FileCacheStore {
    /// Open the store, loading the snapshot from disk once. A missing
    /// file yields an empty map; an unreadable one is reset to empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mirror = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cache file corrupted, resetting to empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache file unreadable, resetting to empty");
                HashMap::new()
            }
        };

        Self {
            path,
            mirror: Mutex::new(mirror),
        }
    }

    fn write_snapshot(&self, entries: &HashMap<String, CacheEntry>) {
        let raw = match serde_json::to_string(entries) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to serialize cache snapshot");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, raw) {
            warn!(path = %self.path.display(), error = %e, "failed to write cache file, keeping in-memory state");
        }
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.mirror.lock().await.clone()
    }

    async fn replace(&self, entries: HashMap<String, CacheEntry>) {
        let mut mirror = self.mirror.lock().await;
        *mirror = entries;
        // Mirror stays authoritative even when the disk write fails
        self.write_snapshot(&mirror);
    }
}
