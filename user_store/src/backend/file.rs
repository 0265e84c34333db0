//! Exclusive-file subscriber backend
//!
//! The process exclusively owns one JSON file holding every subscriber
//! record; each write re-serializes the whole set. Suitable for
//! single-instance deployments without a database.

use super::UserBackend;
use crate::errors::StoreError;
use crate::record::{UserId, UserRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

pub struct FileUserBackend {
    path: PathBuf,
    records: Mutex<HashMap<UserId, UserRecord>>,
}

impl FileUserBackend {
    /// Open the backend, loading all records once. A missing file yields
    /// an empty set; an unreadable one is reset to empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<UserRecord>>(&raw) {
                Ok(list) => list.into_iter().map(|r| (r.id, r)).collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "user file corrupted, resetting to empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "user file unreadable, resetting to empty");
                HashMap::new()
            }
        };

        Self {
            path,
            records: Mutex::new(records),
        }
    }

    fn write_snapshot(&self, records: &HashMap<UserId, UserRecord>) -> Result<(), StoreError> {
        let mut list: Vec<&UserRecord> = records.values().collect();
        list.sort_by_key(|r| r.id);
        let raw = serde_json::to_string(&list)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl UserBackend for FileUserBackend {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn store_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.insert(record.id, record.clone());
        self.write_snapshot(&records)
    }

    async fn remove_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.remove(&id);
        self.write_snapshot(&records)
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let records = self.records.lock().await;
        let mut list: Vec<UserRecord> = records.values().cloned().collect();
        list.sort_by_key(|r| r.id);
        Ok(list)
    }
}
